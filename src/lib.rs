pub mod bind;
pub mod convert;
pub mod source;

mod error;
mod settings;

pub use bind::{BindPlan, Bindable, Pairs};
pub use convert::{ConvertError, Converter, ConverterRegistry, Locale, TypedConverter};
pub use error::ConfigError;
pub use settings::{Settings, SettingsBuilder};
pub use source::{ConfigSource, EnvSource, FileSource, MemorySource};
