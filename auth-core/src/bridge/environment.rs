use std::fmt;
use std::str::FromStr;

/// Answers the questions transports used to ask of global browser objects.
pub trait EnvironmentProbe {
    /// A popup opened by another window
    fn has_opener(&self) -> bool;

    /// Framed inside another document
    fn has_parent(&self) -> bool;

    /// A React Native bridge object was injected
    fn has_native_bridge(&self) -> bool;
}

/// Kind of host the surface runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostKind {
    Popup,
    Embedded,
    WebView,
    Standalone,
}

impl HostKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HostKind::Popup => "popup",
            HostKind::Embedded => "embedded",
            HostKind::WebView => "webview",
            HostKind::Standalone => "standalone",
        }
    }
}

impl fmt::Display for HostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HostKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "popup" => Ok(HostKind::Popup),
            "embedded" | "iframe" => Ok(HostKind::Embedded),
            "webview" => Ok(HostKind::WebView),
            "standalone" => Ok(HostKind::Standalone),
            other => Err(format!("unknown host kind: {}", other)),
        }
    }
}

/// Fixed answers, captured once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaticEnvironment {
    pub opener: bool,
    pub parent: bool,
    pub native_bridge: bool,
}

impl StaticEnvironment {
    /// The capabilities a host of the given kind exposes.
    pub fn for_kind(kind: HostKind) -> Self {
        match kind {
            HostKind::Popup => Self { opener: true, ..Self::default() },
            HostKind::Embedded => Self { parent: true, ..Self::default() },
            HostKind::WebView => Self { native_bridge: true, ..Self::default() },
            HostKind::Standalone => Self::default(),
        }
    }
}

impl EnvironmentProbe for StaticEnvironment {
    fn has_opener(&self) -> bool {
        self.opener
    }

    fn has_parent(&self) -> bool {
        self.parent
    }

    fn has_native_bridge(&self) -> bool {
        self.native_bridge
    }
}
