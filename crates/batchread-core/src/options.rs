//! Reader options: read modes, callback hooks and the deep merge between
//! reader-wide defaults and per-binding overrides.
//!
//! # Design
//! - Nested structures (the callback set) merge member by member.
//! - Scalar and list fields replace wholesale when an override provides them.
//! - [`ReaderSettings`] is the serde-facing subset (no callbacks) used by config files.

use std::fmt::{self, Debug, Display, Formatter};
use std::rc::Rc;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ReadError, ReadResult};
use crate::model::{FileDescriptor, FileGroup};
use crate::pattern::TypePattern;

/// Format a file's contents are decoded into.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReadMode {
    /// Raw bytes.
    ArrayBuffer,
    /// One character per byte.
    BinaryString,
    /// Decoded text.
    Text,
    /// `data:` URL with base64 payload.
    #[default]
    #[serde(rename = "DataURL", alias = "DataUrl")]
    DataUrl,
}

impl ReadMode {
    /// Canonical name, as accepted in config files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ArrayBuffer => "ArrayBuffer",
            Self::BinaryString => "BinaryString",
            Self::Text => "Text",
            Self::DataUrl => "DataURL",
        }
    }
}

impl Display for ReadMode {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for ReadMode {
    type Err = ReadError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "arraybuffer" | "bytes" => Ok(Self::ArrayBuffer),
            "binarystring" | "binary" => Ok(Self::BinaryString),
            "text" => Ok(Self::Text),
            "dataurl" | "data-url" => Ok(Self::DataUrl),
            _ => Err(ReadError::InvalidReadMode {
                value: value.to_string(),
            }),
        }
    }
}

/// One `pattern → mode` rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadModeRule {
    /// Content-type pattern.
    pub pattern: TypePattern,
    /// Mode used when the pattern matches.
    pub mode: ReadMode,
}

/// Ordered read-mode rules with a fallback.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReadModeMap {
    /// Rules tested in order; the first match wins.
    pub rules: Vec<ReadModeRule>,
    /// Mode used when no rule matches.
    pub default: ReadMode,
}

impl ReadModeMap {
    /// Map with no rules and the given fallback.
    #[must_use]
    pub const fn with_default(default: ReadMode) -> Self {
        Self {
            rules: Vec::new(),
            default,
        }
    }

    /// Append a rule, compiling its pattern.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::InvalidPattern`] when the pattern is malformed.
    pub fn rule(mut self, pattern: &str, mode: ReadMode) -> ReadResult<Self> {
        self.rules.push(ReadModeRule {
            pattern: TypePattern::new(pattern)?,
            mode,
        });
        Ok(self)
    }

    /// Choose the read mode for a content type.
    #[must_use]
    pub fn select(&self, content_type: &str) -> ReadMode {
        self.rules
            .iter()
            .find(|rule| rule.pattern.matches(content_type))
            .map_or(self.default, |rule| rule.mode)
    }
}

/// Hook receiving a lifecycle event and the file it belongs to.
pub type EventHook<H, E> = Rc<dyn Fn(&E, &Rc<FileDescriptor<H>>)>;
/// Hook receiving a single file.
pub type FileHook<H> = Rc<dyn Fn(&Rc<FileDescriptor<H>>)>;
/// Hook receiving a whole batch.
pub type GroupHook<H> = Rc<dyn Fn(&Rc<FileGroup<H>>)>;

/// Full callback set; every member defaults to a no-op.
pub struct Callbacks<H, E> {
    /// Read started.
    pub loadstart: EventHook<H, E>,
    /// Read progressed.
    pub progress: EventHook<H, E>,
    /// Read succeeded.
    pub load: EventHook<H, E>,
    /// Read aborted.
    pub abort: EventHook<H, E>,
    /// Read failed.
    pub error: EventHook<H, E>,
    /// Read finished, whatever the outcome.
    pub loadend: EventHook<H, E>,
    /// File rejected by the accept pattern.
    pub skip: FileHook<H>,
    /// Batch taken in, before any read starts.
    pub groupstart: GroupHook<H>,
    /// Every accepted file of the batch has finished.
    pub groupend: GroupHook<H>,
}

impl<H: 'static, E: 'static> Default for Callbacks<H, E> {
    fn default() -> Self {
        let event: EventHook<H, E> = Rc::new(|_: &E, _: &Rc<FileDescriptor<H>>| {});
        let file: FileHook<H> = Rc::new(|_: &Rc<FileDescriptor<H>>| {});
        let group: GroupHook<H> = Rc::new(|_: &Rc<FileGroup<H>>| {});
        Self {
            loadstart: event.clone(),
            progress: event.clone(),
            load: event.clone(),
            abort: event.clone(),
            error: event.clone(),
            loadend: event,
            skip: file,
            groupstart: group.clone(),
            groupend: group,
        }
    }
}

impl<H, E> Clone for Callbacks<H, E> {
    fn clone(&self) -> Self {
        Self {
            loadstart: self.loadstart.clone(),
            progress: self.progress.clone(),
            load: self.load.clone(),
            abort: self.abort.clone(),
            error: self.error.clone(),
            loadend: self.loadend.clone(),
            skip: self.skip.clone(),
            groupstart: self.groupstart.clone(),
            groupend: self.groupend.clone(),
        }
    }
}

impl<H, E> Debug for Callbacks<H, E> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("Callbacks").finish_non_exhaustive()
    }
}

impl<H, E> Callbacks<H, E> {
    /// Overlay the hooks present in `overrides`, keeping the rest.
    #[must_use]
    pub fn merged(&self, overrides: &CallbacksOverride<H, E>) -> Self {
        let pick_event = |base: &EventHook<H, E>, over: &Option<EventHook<H, E>>| {
            over.as_ref().unwrap_or(base).clone()
        };
        Self {
            loadstart: pick_event(&self.loadstart, &overrides.loadstart),
            progress: pick_event(&self.progress, &overrides.progress),
            load: pick_event(&self.load, &overrides.load),
            abort: pick_event(&self.abort, &overrides.abort),
            error: pick_event(&self.error, &overrides.error),
            loadend: pick_event(&self.loadend, &overrides.loadend),
            skip: overrides.skip.as_ref().unwrap_or(&self.skip).clone(),
            groupstart: overrides
                .groupstart
                .as_ref()
                .unwrap_or(&self.groupstart)
                .clone(),
            groupend: overrides
                .groupend
                .as_ref()
                .unwrap_or(&self.groupend)
                .clone(),
        }
    }
}

/// Partial callback set used as a per-binding override.
pub struct CallbacksOverride<H, E> {
    /// Read started.
    pub loadstart: Option<EventHook<H, E>>,
    /// Read progressed.
    pub progress: Option<EventHook<H, E>>,
    /// Read succeeded.
    pub load: Option<EventHook<H, E>>,
    /// Read aborted.
    pub abort: Option<EventHook<H, E>>,
    /// Read failed.
    pub error: Option<EventHook<H, E>>,
    /// Read finished.
    pub loadend: Option<EventHook<H, E>>,
    /// File skipped.
    pub skip: Option<FileHook<H>>,
    /// Batch started.
    pub groupstart: Option<GroupHook<H>>,
    /// Batch finished.
    pub groupend: Option<GroupHook<H>>,
}

impl<H, E> Default for CallbacksOverride<H, E> {
    fn default() -> Self {
        Self {
            loadstart: None,
            progress: None,
            load: None,
            abort: None,
            error: None,
            loadend: None,
            skip: None,
            groupstart: None,
            groupend: None,
        }
    }
}

impl<H, E> Clone for CallbacksOverride<H, E> {
    fn clone(&self) -> Self {
        Self {
            loadstart: self.loadstart.clone(),
            progress: self.progress.clone(),
            load: self.load.clone(),
            abort: self.abort.clone(),
            error: self.error.clone(),
            loadend: self.loadend.clone(),
            skip: self.skip.clone(),
            groupstart: self.groupstart.clone(),
            groupend: self.groupend.clone(),
        }
    }
}

impl<H, E> Debug for CallbacksOverride<H, E> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CallbacksOverride")
            .finish_non_exhaustive()
    }
}

impl<H: 'static, E: 'static> CallbacksOverride<H, E> {
    /// Set the `loadstart` hook.
    #[must_use]
    pub fn on_loadstart(mut self, hook: impl Fn(&E, &Rc<FileDescriptor<H>>) + 'static) -> Self {
        self.loadstart = Some(Rc::new(hook));
        self
    }

    /// Set the `progress` hook.
    #[must_use]
    pub fn on_progress(mut self, hook: impl Fn(&E, &Rc<FileDescriptor<H>>) + 'static) -> Self {
        self.progress = Some(Rc::new(hook));
        self
    }

    /// Set the `load` hook.
    #[must_use]
    pub fn on_load(mut self, hook: impl Fn(&E, &Rc<FileDescriptor<H>>) + 'static) -> Self {
        self.load = Some(Rc::new(hook));
        self
    }

    /// Set the `abort` hook.
    #[must_use]
    pub fn on_abort(mut self, hook: impl Fn(&E, &Rc<FileDescriptor<H>>) + 'static) -> Self {
        self.abort = Some(Rc::new(hook));
        self
    }

    /// Set the `error` hook.
    #[must_use]
    pub fn on_error(mut self, hook: impl Fn(&E, &Rc<FileDescriptor<H>>) + 'static) -> Self {
        self.error = Some(Rc::new(hook));
        self
    }

    /// Set the `loadend` hook.
    #[must_use]
    pub fn on_loadend(mut self, hook: impl Fn(&E, &Rc<FileDescriptor<H>>) + 'static) -> Self {
        self.loadend = Some(Rc::new(hook));
        self
    }

    /// Set the `skip` hook.
    #[must_use]
    pub fn on_skip(mut self, hook: impl Fn(&Rc<FileDescriptor<H>>) + 'static) -> Self {
        self.skip = Some(Rc::new(hook));
        self
    }

    /// Set the `groupstart` hook.
    #[must_use]
    pub fn on_groupstart(mut self, hook: impl Fn(&Rc<FileGroup<H>>) + 'static) -> Self {
        self.groupstart = Some(Rc::new(hook));
        self
    }

    /// Set the `groupend` hook.
    #[must_use]
    pub fn on_groupend(mut self, hook: impl Fn(&Rc<FileGroup<H>>) + 'static) -> Self {
        self.groupend = Some(Rc::new(hook));
        self
    }
}

/// Fully resolved options for one binding.
pub struct ReaderOptions<H, E> {
    /// Only files whose content type matches are read.
    pub accept: Option<TypePattern>,
    /// Class applied to a drop target while a drag hovers it.
    pub drag_class: Option<String>,
    /// Read-mode selection.
    pub read_as: ReadModeMap,
    /// Callback hooks.
    pub on: Callbacks<H, E>,
}

impl<H: 'static, E: 'static> Default for ReaderOptions<H, E> {
    fn default() -> Self {
        Self {
            accept: None,
            drag_class: None,
            read_as: ReadModeMap::default(),
            on: Callbacks::default(),
        }
    }
}

impl<H, E> Clone for ReaderOptions<H, E> {
    fn clone(&self) -> Self {
        Self {
            accept: self.accept.clone(),
            drag_class: self.drag_class.clone(),
            read_as: self.read_as.clone(),
            on: self.on.clone(),
        }
    }
}

impl<H, E> Debug for ReaderOptions<H, E> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ReaderOptions")
            .field("accept", &self.accept)
            .field("drag_class", &self.drag_class)
            .field("read_as", &self.read_as)
            .finish_non_exhaustive()
    }
}

impl<H, E> ReaderOptions<H, E> {
    /// Deep-merge `overrides` over these options.
    #[must_use]
    pub fn merged(&self, overrides: &OptionsOverride<H, E>) -> Self {
        Self {
            accept: overrides
                .accept
                .clone()
                .unwrap_or_else(|| self.accept.clone()),
            drag_class: overrides
                .drag_class
                .clone()
                .unwrap_or_else(|| self.drag_class.clone()),
            read_as: ReadModeMap {
                rules: overrides
                    .read_as_map
                    .clone()
                    .unwrap_or_else(|| self.read_as.rules.clone()),
                default: overrides.read_as_default.unwrap_or(self.read_as.default),
            },
            on: self.on.merged(&overrides.on),
        }
    }
}

/// Partial options supplied when binding an input or drop target.
pub struct OptionsOverride<H, E> {
    /// Replacement accept pattern; `Some(None)` clears the default filter.
    pub accept: Option<Option<TypePattern>>,
    /// Replacement drag class; `Some(None)` clears the default class.
    pub drag_class: Option<Option<String>>,
    /// Replacement rule list (replaces the default list wholesale).
    pub read_as_map: Option<Vec<ReadModeRule>>,
    /// Replacement fallback mode.
    pub read_as_default: Option<ReadMode>,
    /// Hooks merged member by member.
    pub on: CallbacksOverride<H, E>,
}

impl<H, E> Default for OptionsOverride<H, E> {
    fn default() -> Self {
        Self {
            accept: None,
            drag_class: None,
            read_as_map: None,
            read_as_default: None,
            on: CallbacksOverride::default(),
        }
    }
}

impl<H, E> Clone for OptionsOverride<H, E> {
    fn clone(&self) -> Self {
        Self {
            accept: self.accept.clone(),
            drag_class: self.drag_class.clone(),
            read_as_map: self.read_as_map.clone(),
            read_as_default: self.read_as_default,
            on: self.on.clone(),
        }
    }
}

impl<H, E> Debug for OptionsOverride<H, E> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("OptionsOverride")
            .field("accept", &self.accept)
            .field("drag_class", &self.drag_class)
            .field("read_as_map", &self.read_as_map)
            .field("read_as_default", &self.read_as_default)
            .finish_non_exhaustive()
    }
}

impl<H, E> OptionsOverride<H, E> {
    /// Replace the callback overrides.
    #[must_use]
    pub fn with_callbacks(mut self, on: CallbacksOverride<H, E>) -> Self {
        self.on = on;
        self
    }
}

/// Serializable rule as written in config files.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadModeRuleSpec {
    /// Content-type pattern source.
    pub pattern: String,
    /// Mode used when the pattern matches.
    pub mode: ReadMode,
}

/// Config-file view of the non-callback options.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReaderSettings {
    /// Accept pattern source.
    pub accept: Option<String>,
    /// Drag class name.
    pub drag_class: Option<String>,
    /// Read-mode rules.
    pub read_as_map: Option<Vec<ReadModeRuleSpec>>,
    /// Fallback read mode.
    pub read_as_default: Option<ReadMode>,
}

impl ReaderSettings {
    /// Layer `higher` over `self`; fields set in `higher` win.
    #[must_use]
    pub fn layered(self, higher: Self) -> Self {
        Self {
            accept: higher.accept.or(self.accept),
            drag_class: higher.drag_class.or(self.drag_class),
            read_as_map: higher.read_as_map.or(self.read_as_map),
            read_as_default: higher.read_as_default.or(self.read_as_default),
        }
    }

    /// Compile the settings into an options override.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::InvalidPattern`] when any pattern is malformed.
    pub fn into_override<H, E>(self) -> ReadResult<OptionsOverride<H, E>> {
        let accept = self.accept.map(TypePattern::new).transpose()?;
        let read_as_map = self
            .read_as_map
            .map(|rules| {
                rules
                    .into_iter()
                    .map(|rule| {
                        Ok(ReadModeRule {
                            pattern: TypePattern::new(rule.pattern)?,
                            mode: rule.mode,
                        })
                    })
                    .collect::<ReadResult<Vec<_>>>()
            })
            .transpose()?;
        Ok(OptionsOverride {
            accept: accept.map(Some),
            drag_class: self.drag_class.map(Some),
            read_as_map,
            read_as_default: self.read_as_default,
            on: CallbacksOverride::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    type Opts = ReaderOptions<Unit, String>;

    #[test]
    fn first_matching_rule_wins() {
        let map = ReadModeMap::with_default(ReadMode::BinaryString)
            .rule("image/*", ReadMode::DataUrl)
            .and_then(|map| map.rule("text/*", ReadMode::Text))
            .expect("rules");
        assert_eq!(map.select("image/png"), ReadMode::DataUrl);
        assert_eq!(map.select("text/plain"), ReadMode::Text);
        assert_eq!(map.select("application/pdf"), ReadMode::BinaryString);
    }

    #[test]
    fn overlapping_rules_respect_order() {
        let map = ReadModeMap::with_default(ReadMode::DataUrl)
            .rule("^text/", ReadMode::Text)
            .and_then(|map| map.rule("text/csv", ReadMode::ArrayBuffer))
            .expect("rules");
        assert_eq!(map.select("text/csv"), ReadMode::Text);
    }

    #[test]
    fn read_mode_parses_aliases() {
        assert_eq!("DataURL".parse::<ReadMode>().ok(), Some(ReadMode::DataUrl));
        assert_eq!("bytes".parse::<ReadMode>().ok(), Some(ReadMode::ArrayBuffer));
        assert_eq!(" Text ".parse::<ReadMode>().ok(), Some(ReadMode::Text));
        assert!(matches!(
            "jpeg".parse::<ReadMode>(),
            Err(ReadError::InvalidReadMode { .. })
        ));
    }

    #[test]
    fn merge_keeps_default_hooks_not_overridden() {
        let log = Rc::new(RefCell::new(Vec::<&'static str>::new()));
        let mut defaults = Opts::default();
        let sink = log.clone();
        defaults.on.skip = Rc::new(move |_: &Rc<FileDescriptor<Unit>>| {
            sink.borrow_mut().push("default-skip");
        });
        let sink = log.clone();
        defaults.on.groupend = Rc::new(move |_: &Rc<FileGroup<Unit>>| {
            sink.borrow_mut().push("default-groupend");
        });

        let sink = log.clone();
        let overrides = OptionsOverride::default().with_callbacks(
            CallbacksOverride::default()
                .on_groupend(move |_| sink.borrow_mut().push("override-groupend")),
        );
        let merged = defaults.merged(&overrides);

        let group = Rc::new(FileGroup::<Unit>::new(crate::ids::GroupId::next(), Vec::new()));
        (merged.on.groupend)(&group);
        let file = Rc::new(FileDescriptor::intake(Unit, group.id()));
        (merged.on.skip)(&file);

        assert_eq!(*log.borrow(), vec!["override-groupend", "default-skip"]);
    }

    #[test]
    fn merge_replaces_lists_and_scalars_wholesale() {
        let mut defaults = Opts::default();
        defaults.accept = Some(TypePattern::new("image/*").expect("pattern"));
        defaults.drag_class = Some("drag".into());
        defaults.read_as = ReadModeMap::with_default(ReadMode::Text)
            .rule("image/*", ReadMode::DataUrl)
            .and_then(|map| map.rule("audio/*", ReadMode::ArrayBuffer))
            .expect("rules");

        let overrides: OptionsOverride<Unit, String> = ReaderSettings {
            read_as_map: Some(vec![ReadModeRuleSpec {
                pattern: "video/*".into(),
                mode: ReadMode::BinaryString,
            }]),
            ..ReaderSettings::default()
        }
        .into_override()
        .expect("override");

        let merged = defaults.merged(&overrides);
        assert_eq!(merged.read_as.rules.len(), 1);
        assert_eq!(merged.read_as.select("image/png"), ReadMode::Text);
        assert_eq!(merged.read_as.select("video/mp4"), ReadMode::BinaryString);
        assert_eq!(merged.accept.as_ref().map(TypePattern::as_str), Some("image/*"));
        assert_eq!(merged.drag_class.as_deref(), Some("drag"));
    }

    #[test]
    fn merge_can_clear_accept_and_drag_class() {
        let mut defaults = Opts::default();
        defaults.accept = Some(TypePattern::new("image/*").expect("pattern"));
        defaults.drag_class = Some("drag".into());

        let overrides = OptionsOverride::<Unit, String> {
            accept: Some(None),
            drag_class: Some(None),
            ..OptionsOverride::default()
        };
        let merged = defaults.merged(&overrides);
        assert!(merged.accept.is_none());
        assert!(merged.drag_class.is_none());

        let kept = defaults.merged(&OptionsOverride::default());
        assert_eq!(kept.accept.as_ref().map(TypePattern::as_str), Some("image/*"));
        assert_eq!(kept.drag_class.as_deref(), Some("drag"));
    }

    #[test]
    fn settings_layer_and_deserialize() {
        let file: ReaderSettings = serde_json::from_str(
            r#"{"accept":"image/*","read_as_default":"Text","read_as_map":[{"pattern":"png","mode":"DataURL"}]}"#,
        )
        .expect("settings");
        let flags = ReaderSettings {
            accept: Some("text/*".into()),
            ..ReaderSettings::default()
        };
        let layered = file.layered(flags);
        assert_eq!(layered.accept.as_deref(), Some("text/*"));
        assert_eq!(layered.read_as_default, Some(ReadMode::Text));
        assert_eq!(layered.read_as_map.map(|rules| rules.len()), Some(1));
    }

    #[test]
    fn settings_reject_unknown_fields() {
        let parsed = serde_json::from_str::<ReaderSettings>(r#"{"readAs":"Text"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn settings_surface_bad_patterns() {
        let settings = ReaderSettings {
            accept: Some("(".into()),
            ..ReaderSettings::default()
        };
        assert!(matches!(
            settings.into_override::<Unit, ()>(),
            Err(ReadError::InvalidPattern { .. })
        ));
    }

    struct Unit;

    impl crate::model::FileMeta for Unit {
        fn name(&self) -> String {
            "unit.bin".into()
        }
        fn content_type(&self) -> String {
            String::new()
        }
        fn size(&self) -> u64 {
            0
        }
    }
}
