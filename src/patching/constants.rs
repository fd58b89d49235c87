/// Integer type a `#define` constant is emitted with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Width {
    U32,
    I32,
    I64,
    U64,
}

/// Virtual key and key code macros are compared against unsigned values.
pub fn is_key_code(name: &str) -> bool {
    name.starts_with("XPLM_VK") || name.starts_with("XPLM_KEY")
}

pub fn integer_width(name: &str, value: i64, repr: &str) -> Width {
    if is_key_code(name) && value >= 0 && value <= u32::MAX as i64 {
        return Width::U32;
    }
    let hex = repr.trim_start_matches('(').trim_start().starts_with("0x");
    // hex literals above i64::MAX wrap to negative while parsing
    if hex && value < 0 && !repr.contains('-') {
        Width::U64
    } else if value >= i32::MIN as i64 && value <= i32::MAX as i64 {
        Width::I32
    } else {
        Width::I64
    }
}
