use lazy_static::lazy_static;
use std::collections::HashMap;

/// Enumerations whose values are combined as bit flags.
pub const BITFIELDS: &[&str] = &["XPLMDataTypeID", "XPLMKeyFlags", "XPLMNavType"];

pub fn is_bitfield(enumeration: &str) -> bool {
    BITFIELDS.contains(&enumeration)
}

enum Trim {
    Start(&'static str),
    End(&'static str),
}

lazy_static! {
    static ref TRIMS: HashMap<&'static str, Trim> = HashMap::from([
        ("XPLMCameraControlDuration", Trim::Start("ControlCamera")),
        ("XPLMDataTypeID", Trim::Start("Type")),
        ("XPLMKeyFlags", Trim::End("Flag")),
        ("XPLMDrawingPhase", Trim::Start("Phase")),
        ("XPLMMouseStatus", Trim::Start("Mouse")),
        ("XPLMCursorStatus", Trim::Start("Cursor")),
        ("XPLMWindowLayer", Trim::Start("WindowLayer")),
        ("XPLMWindowDecoration", Trim::Start("WindowDecoration")),
        ("XPLMWindowPositioningMode", Trim::Start("Window")),
        ("XPLMFontID", Trim::Start("Font")),
        ("XPLMMapStyle", Trim::Start("MapStyle")),
        ("XPLMMapLayerType", Trim::Start("MapLayer")),
        ("XPLMMapOrientation", Trim::Start("MapOrientation")),
        ("XPLMMenuCheck", Trim::Start("Menu")),
        ("XPLMNavType", Trim::Start("Nav")),
        ("XPLMFlightLoopPhaseType", Trim::Start("FlightLoop_Phase")),
        ("XPLMProbeType", Trim::Start("Probe")),
        ("XPLMProbeResult", Trim::Start("Probe")),
        ("XPLMAudioBus", Trim::Start("Audio")),
        ("XPLMBankID", Trim::End("Bank")),
        ("XPLMCommandPhase", Trim::Start("Command")),
        ("XPLMDataFileType", Trim::Start("DataFile")),
        ("XPLMHostApplicationID", Trim::Start("Host")),
        ("XPLMLanguageCode", Trim::Start("Language")),
        ("XPWindowStyle", Trim::Start("xpWindow")),
        ("XPElementStyle", Trim::Start("xpElement")),
        ("XPTrackStyle", Trim::Start("xpTrack")),
        ("XPWidgetPropertyID", Trim::Start("xpProperty")),
        ("XPDispatchMode", Trim::Start("xpMode")),
        ("XPWidgetMessage", Trim::Start("xpMsg")),
    ]);
}

/// `xplm_device_GNS430_1` becomes `GNS430_Pilot`.
fn device_name(variant: &str) -> Option<String> {
    let side = match variant.chars().last()? {
        '1' => "Pilot",
        '2' => "Copilot",
        '3' => "Center",
        _ => return None,
    };
    let stem = variant.strip_suffix(|c: char| c.is_ascii_digit())?;
    let stem = stem.trim_start_matches("device_");
    if !stem.ends_with('_') {
        return None;
    }
    Some(format!("{}{}", stem, side))
}

fn trim_widget_variant<'a>(enumeration: &str, mut variant: &'a str) -> &'a str {
    variant = variant.trim_start_matches("xp").trim_start_matches('_');
    if enumeration.ends_with("Property") {
        variant = variant.trim_start_matches("Property");
    } else if enumeration.ends_with("Message") {
        variant = variant
            .trim_start_matches("Message")
            .trim_start_matches("Msg");
    } else if enumeration == "XPScrollBarType" {
        variant = variant.trim_start_matches("ScrollBarType");
    } else if enumeration == "XPTextFieldType" {
        variant = variant.trim_start_matches("Text");
    } else if enumeration == "XPButtonBehavior" {
        variant = variant.trim_start_matches("ButtonBehavior");
    }
    variant
}

/// Shortens an SDK enumerator to the associated constant name used on its
/// newtype, e.g. `xplm_ControlCameraForever` on `XPLMCameraControlDuration`
/// becomes `Forever`.
pub fn variant_name(enumeration: &str, original: &str) -> String {
    let stripped = original.trim_start_matches("xplm").trim_start_matches('_');

    let variant = if enumeration == "XPLMDeviceID" {
        if let Some(name) = device_name(stripped) {
            return name;
        }
        stripped.trim_start_matches("device")
    } else {
        match TRIMS.get(enumeration) {
            Some(Trim::Start(prefix)) => stripped.trim_start_matches(prefix),
            Some(Trim::End(suffix)) => stripped.trim_end_matches(suffix),
            None if !enumeration.starts_with("XPLM") && enumeration.starts_with("XP") => {
                trim_widget_variant(enumeration, stripped)
            }
            None => stripped,
        }
    };
    let variant = variant.trim_start_matches('_');

    if variant.is_empty() {
        original.to_string()
    } else if variant.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{}", variant)
    } else {
        variant.to_string()
    }
}
