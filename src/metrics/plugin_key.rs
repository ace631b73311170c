use strum::{EnumIter, IntoEnumIterator};

/// Log target for plugin key parsing
const LOG_TARGET: &str = "   plugins";

/// Raw plugin-list value that disables metric collection entirely.
const NONE_SENTINEL: &str = "none";

/// Single-letter monitoring plugin selector.
///
/// Declaration order is the canonical catalog order (`f,l,m,s,p,g,u,v`);
/// the generated metrics document always follows it regardless of how the
/// operator ordered the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum PluginKey {
    /// `f`: CPU frequency
    CpuFrequency,

    /// `l`: system load average
    Load,

    /// `m`: memory usage
    MemoryUsage,

    /// `s`: swap usage
    SwapUsage,

    /// `p`: chassis power consumption
    PowerConsumption,

    /// `g`: per-GPU power draw
    GpuPower,

    /// `u`: per-GPU utilization
    GpuUsage,

    /// `v`: per-GPU memory usage
    GpuMemory,
}

impl PluginKey {
    /// The command-line letter for this key.
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::CpuFrequency => 'f',
            Self::Load => 'l',
            Self::MemoryUsage => 'm',
            Self::SwapUsage => 's',
            Self::PowerConsumption => 'p',
            Self::GpuPower => 'g',
            Self::GpuUsage => 'u',
            Self::GpuMemory => 'v',
        }
    }

    /// GPU keys expand into one metric per GPU index and are dropped when
    /// no GPUs are available.
    #[must_use]
    pub const fn is_gpu(self) -> bool {
        matches!(self, Self::GpuPower | Self::GpuUsage | Self::GpuMemory)
    }

    fn from_letter(letter: &str) -> Option<Self> {
        let mut chars = letter.chars();
        let (first, rest) = (chars.next()?, chars.next());
        if rest.is_some() {
            return None;
        }

        Self::iter().find(|key| key.letter() == first)
    }
}

/// Which monitoring plugins the operator asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginSelection {
    /// The literal `none` sentinel: no plugins at all.
    Disabled,

    /// No explicit request: the default key set applies.
    Unset,

    /// Explicitly requested keys, in request order, deduplicated.
    Keys(Vec<PluginKey>),
}

impl PluginSelection {
    /// Parse a raw comma-separated plugin list from the command line or
    /// settings file.
    ///
    /// Unknown keys are skipped with a warning; a bad key never fails the
    /// whole request.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::Unset;
        };

        let raw = raw.trim();
        if raw.is_empty() {
            return Self::Unset;
        }

        if raw == NONE_SENTINEL {
            return Self::Disabled;
        }

        let mut keys = Vec::new();
        for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match PluginKey::from_letter(token) {
                Some(key) => {
                    if !keys.contains(&key) {
                        keys.push(key);
                    }
                }
                None => log::warn!(target: LOG_TARGET, "ignoring unknown plugin key '{token}'"),
            }
        }

        Self::Keys(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_iteration_order() {
        let letters: String = PluginKey::iter().map(PluginKey::letter).collect();
        assert_eq!(letters, "flmspguv");
    }

    #[test]
    fn parse_explicit_keys() {
        let selection = PluginSelection::parse(Some("f,g"));
        assert_eq!(selection, PluginSelection::Keys(vec![PluginKey::CpuFrequency, PluginKey::GpuPower]));
    }

    #[test]
    fn parse_none_sentinel() {
        assert_eq!(PluginSelection::parse(Some("none")), PluginSelection::Disabled);
    }

    #[test]
    fn parse_empty_and_absent_are_unset() {
        assert_eq!(PluginSelection::parse(None), PluginSelection::Unset);
        assert_eq!(PluginSelection::parse(Some("")), PluginSelection::Unset);
        assert_eq!(PluginSelection::parse(Some("  ")), PluginSelection::Unset);
    }

    #[test]
    fn unknown_keys_are_skipped_not_fatal() {
        let selection = PluginSelection::parse(Some("f,x,zz,l"));
        assert_eq!(selection, PluginSelection::Keys(vec![PluginKey::CpuFrequency, PluginKey::Load]));
    }

    #[test]
    fn duplicate_keys_collapse() {
        let selection = PluginSelection::parse(Some("f,f,l,f"));
        assert_eq!(selection, PluginSelection::Keys(vec![PluginKey::CpuFrequency, PluginKey::Load]));
    }

    #[test]
    fn gpu_keys_are_marked() {
        assert!(PluginKey::GpuPower.is_gpu());
        assert!(PluginKey::GpuUsage.is_gpu());
        assert!(PluginKey::GpuMemory.is_gpu());
        assert!(!PluginKey::CpuFrequency.is_gpu());
    }
}
