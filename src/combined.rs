//! The single include point for the whole SDK surface.
//!
//! Mirrors the C header a plugin would include: an optional block of FMOD
//! stand-in types, then every widget header, then every XPLM header.

/// Defined when the FMOD libraries are not available to the build.
pub const FMOD_STUB_FLAG: &str = "_FMOD_STUB_";

/// Include guard of the real `fmod_common.h`. Defining it up front keeps
/// the real header from redefining the stand-in types.
pub const FMOD_GUARD_MACRO: &str = "_FMOD_COMMON_H";

/// Include guard of the aggregated header itself.
pub const COMBINED_GUARD_MACRO: &str = "XPLM_GEN_COMBINED_H";

/// File name the aggregated header is processed under.
pub const COMBINED_FILE: &str = "combined.h";

pub const WIDGET_HEADERS: [&str; 5] = [
    "XPWidgetDefs.h",
    "XPWidgetUtils.h",
    "XPStandardWidgets.h",
    "XPUIGraphics.h",
    "XPWidgets.h",
];

pub const XPLM_HEADERS: [&str; 16] = [
    "XPLMCamera.h",
    "XPLMDataAccess.h",
    "XPLMDefs.h",
    "XPLMDisplay.h",
    "XPLMGraphics.h",
    "XPLMInstance.h",
    "XPLMMap.h",
    "XPLMMenus.h",
    "XPLMNavigation.h",
    "XPLMPlanes.h",
    "XPLMPlugin.h",
    "XPLMProcessing.h",
    "XPLMScenery.h",
    "XPLMSound.h",
    "XPLMUtilities.h",
    "XPLMWeather.h",
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StubCategory {
    /// Only ever handled through a pointer.
    Opaque,
    /// Passed by value as a C `int`.
    Integer,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StubAlias {
    pub name: &'static str,
    pub category: StubCategory,
}

impl StubAlias {
    pub fn c_type(&self) -> &'static str {
        match self.category {
            StubCategory::Opaque => "void",
            StubCategory::Integer => "int",
        }
    }
}

pub const STUB_ALIASES: [StubAlias; 6] = [
    StubAlias {
        name: "FMOD_STUDIO_SYSTEM",
        category: StubCategory::Opaque,
    },
    StubAlias {
        name: "FMOD_CHANNELGROUP",
        category: StubCategory::Opaque,
    },
    StubAlias {
        name: "FMOD_RESULT",
        category: StubCategory::Integer,
    },
    StubAlias {
        name: "FMOD_SOUND_FORMAT",
        category: StubCategory::Integer,
    },
    StubAlias {
        name: "FMOD_CHANNEL",
        category: StubCategory::Opaque,
    },
    StubAlias {
        name: "FMOD_VECTOR",
        category: StubCategory::Opaque,
    },
];

pub fn stub_aliases() -> &'static [StubAlias] {
    &STUB_ALIASES
}

#[derive(Debug, Clone, Default)]
pub struct CombinedHeader;

impl CombinedHeader {
    /// Every aggregated header in include order.
    pub fn headers(&self) -> impl Iterator<Item = &'static str> {
        WIDGET_HEADERS.into_iter().chain(XPLM_HEADERS)
    }

    pub fn render(&self) -> String {
        let mut lines = vec![
            format!("#ifndef {}", COMBINED_GUARD_MACRO),
            format!("#define {}", COMBINED_GUARD_MACRO),
            String::new(),
            format!("#ifdef {}", FMOD_STUB_FLAG),
            format!("#define {}", FMOD_GUARD_MACRO),
        ];
        for alias in stub_aliases() {
            lines.push(format!("typedef {} {};", alias.c_type(), alias.name));
        }
        lines.push("#endif".to_string());
        lines.push(String::new());
        for header in WIDGET_HEADERS {
            lines.push(format!("#include <{}>", header));
        }
        lines.push(String::new());
        for header in XPLM_HEADERS {
            lines.push(format!("#include <{}>", header));
        }
        lines.push(String::new());
        lines.push("#endif".to_string());
        lines.join("\n") + "\n"
    }
}
