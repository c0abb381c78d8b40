//! Turning registry contents into highlighter-ready registrations.

mod language;
mod merge;
mod scopes;
mod theme;

pub use language::{build_registration, embedded_languages, LanguageResolver};
pub use merge::{
    merge_language_configurations, merge_language_contributions, LanguageConfiguration,
    MergedLanguage,
};
pub use scopes::{external_scope, scope_references};
pub use theme::{classify_ui_theme, merge_raw_theme, RawTheme, ThemeResolver};
