use crate::models::{Constant, Enumeration, Enumerator, Error, Header};
use crate::patching::values::parse_integer;
use crate::repr::JsonConverter;
use pest::{error, Parser};
use serde::Deserialize;

#[derive(Parser)]
#[grammar = "./grammars/xplm.pest"]
struct XplmParser;

/// Macros the grammar recognises functions by, kept even where a platform
/// defines them empty.
pub const EXPORT_MACROS: [&str; 2] = ["XPLM_API", "WIDGET_API"];

#[derive(Debug, Deserialize)]
struct AnonymousEnumeration {
    #[serde(default)]
    enumerators: Vec<Enumerator>,
}

/// Anonymous enums without a typedef only introduce integer constants.
fn flatten_anonymous(enumeration: AnonymousEnumeration) -> Result<Vec<Constant>, Error> {
    let mut constants: Vec<Constant> = vec![];
    let mut next: i64 = 0;
    for enumerator in enumeration.enumerators {
        let value = match &enumerator.value {
            None => next,
            Some(repr) => match parse_integer(repr) {
                Some(value) => value,
                None => constants
                    .iter()
                    .find(|constant| &constant.name == repr)
                    .and_then(|constant| parse_integer(&constant.value))
                    .ok_or_else(|| Error::UnresolvedValue(repr.clone()))?,
            },
        };
        next = value + 1;
        constants.push(Constant {
            name: enumerator.name,
            value: value.to_string(),
        });
    }
    Ok(constants)
}

pub fn parse(source: &str) -> Result<Header, Error> {
    let declarations = XplmParser::parse(Rule::api, source)?
        .next()
        .ok_or(Error::FileMalformed)?;

    let converter = JsonConverter::new(&["enumerators", "fields", "arguments"]);

    let mut header = Header::default();
    for declaration in declarations.into_inner() {
        match declaration.as_rule() {
            Rule::OpaqueType => header.opaque_types.push(converter.convert(declaration)?),
            Rule::TypeAlias => header.type_aliases.push(converter.convert(declaration)?),
            Rule::Constant => header.constants.push(converter.convert(declaration)?),
            Rule::Enumeration => {
                let enumeration: Enumeration = converter.convert(declaration)?;
                header.enumerations.push(enumeration)
            }
            Rule::AnonymousEnumeration => header
                .constants
                .extend(flatten_anonymous(converter.convert(declaration)?)?),
            Rule::Structure => header.structures.push(converter.convert(declaration)?),
            Rule::Callback => header.callbacks.push(converter.convert(declaration)?),
            Rule::Function => header.functions.push(converter.convert(declaration)?),
            Rule::Skipped => {
                let text = declaration.as_str().split_whitespace().collect::<Vec<_>>();
                tracing::warn!("skipping unrecognised declaration: {}", text.join(" "));
            }
            _ => continue,
        }
    }

    Ok(header)
}

impl From<error::Error<Rule>> for Error {
    fn from(error: error::Error<Rule>) -> Self {
        Self::Pest(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use crate::models::Pointer::{DoublePointer, NormalPointer};
    use crate::models::Type::{FundamentalType, UserType};
    use crate::models::{
        Argument, Callback, Constant, Enumeration, Enumerator, Field, Function, Header,
        OpaqueType, Structure, TypeAlias,
    };
    use crate::parsers::xplm::parse;

    fn argument(argument_type: crate::models::Type, pointer: bool, name: &str) -> Argument {
        Argument {
            as_const: None,
            argument_type,
            pointer: if pointer {
                Some(NormalPointer("*".into()))
            } else {
                None
            },
            name: name.into(),
            as_array: None,
        }
    }

    #[test]
    fn test_should_ignore_include_guard() {
        let source = r#"
            #ifndef XPLMCamera_h
            #define XPLMCamera_h
            #endif
        "#;
        assert_eq!(parse(source), Ok(Header::default()))
    }

    #[test]
    fn test_should_ignore_api_export_helpers() {
        let source = r#"
            #define XPLM_API __declspec(dllimport)
            #define WIDGET_API XPLM_API
            extern "C" {
            }
        "#;
        let header = parse(source).unwrap();
        assert_eq!(header.functions, vec![]);
        assert_eq!(
            header.constants,
            vec![Constant {
                name: "WIDGET_API".into(),
                value: "XPLM_API".into()
            }]
        );
    }

    #[test]
    fn test_should_parse_constants() {
        let source = r#"
            #define XPLM_NO_PLUGIN_ID    (-1)
            #define XPLM_VK_BACK         0x08
            #define XPLM_MAP_USER_INTERFACE "XPLM_MAP_USER_INTERFACE" /* the map */
        "#;
        assert_eq!(
            parse(source),
            Ok(Header {
                constants: vec![
                    Constant {
                        name: "XPLM_NO_PLUGIN_ID".into(),
                        value: "(-1)".into()
                    },
                    Constant {
                        name: "XPLM_VK_BACK".into(),
                        value: "0x08".into()
                    },
                    Constant {
                        name: "XPLM_MAP_USER_INTERFACE".into(),
                        value: "\"XPLM_MAP_USER_INTERFACE\"".into()
                    },
                ],
                ..Header::default()
            })
        )
    }

    #[test]
    fn test_should_parse_pointer_type_alias() {
        let source = r#"
            /*
             * XPLMWindowID
             *
             * This is an opaque identifier for a window.
             *
             */
            typedef void * XPLMWindowID;
            typedef int XPLMPluginID;
        "#;
        assert_eq!(
            parse(source),
            Ok(Header {
                type_aliases: vec![
                    TypeAlias {
                        as_const: None,
                        base_type: FundamentalType("void".into()),
                        pointer: Some(NormalPointer("*".into())),
                        name: "XPLMWindowID".into()
                    },
                    TypeAlias {
                        as_const: None,
                        base_type: FundamentalType("int".into()),
                        pointer: None,
                        name: "XPLMPluginID".into()
                    }
                ],
                ..Header::default()
            })
        )
    }

    #[test]
    fn test_should_parse_opaque_type() {
        let source = "typedef struct FMOD_SYSTEM FMOD_SYSTEM;";
        assert_eq!(
            parse(source),
            Ok(Header {
                opaque_types: vec![OpaqueType {
                    name: "FMOD_SYSTEM".into()
                }],
                ..Header::default()
            })
        )
    }

    #[test]
    fn test_should_parse_enumeration_followed_by_typedef() {
        let source = r#"
            enum {
                /* Control the camera until the user picks a new view.                       */
                xplm_ControlCameraUntilViewChanges        = 1,

                /* Control the camera until your plugin is disabled or another plugin forcibly*
                 * takes control.                                                             */
                xplm_ControlCameraForever                 = 2,


            };
            typedef int XPLMCameraControlDuration;
        "#;
        assert_eq!(
            parse(source),
            Ok(Header {
                enumerations: vec![Enumeration {
                    name: "XPLMCameraControlDuration".into(),
                    enum_type: FundamentalType("int".into()),
                    enumerators: vec![
                        Enumerator {
                            name: "xplm_ControlCameraUntilViewChanges".into(),
                            value: Some("1".into())
                        },
                        Enumerator {
                            name: "xplm_ControlCameraForever".into(),
                            value: Some("2".into())
                        }
                    ]
                }],
                ..Header::default()
            })
        )
    }

    #[test]
    fn test_should_parse_typedef_enumeration_with_implicit_values() {
        let source = r#"
            typedef enum {
                xpMode_Direct,
                xpMode_UpChain,
                xpMode_Recursive = 2
            } XPDispatchMode;
        "#;
        assert_eq!(
            parse(source),
            Ok(Header {
                enumerations: vec![Enumeration {
                    name: "XPDispatchMode".into(),
                    enum_type: FundamentalType("int".into()),
                    enumerators: vec![
                        Enumerator {
                            name: "xpMode_Direct".into(),
                            value: None
                        },
                        Enumerator {
                            name: "xpMode_UpChain".into(),
                            value: None
                        },
                        Enumerator {
                            name: "xpMode_Recursive".into(),
                            value: Some("2".into())
                        }
                    ]
                }],
                ..Header::default()
            })
        )
    }

    #[test]
    fn test_should_flatten_anonymous_enumeration_into_constants() {
        let source = r#"
            enum {
                xpProperty_First = 100,
                xpProperty_Second,
                xpProperty_Alias = xpProperty_First
            };
        "#;
        assert_eq!(
            parse(source),
            Ok(Header {
                constants: vec![
                    Constant {
                        name: "xpProperty_First".into(),
                        value: "100".into()
                    },
                    Constant {
                        name: "xpProperty_Second".into(),
                        value: "101".into()
                    },
                    Constant {
                        name: "xpProperty_Alias".into(),
                        value: "100".into()
                    }
                ],
                ..Header::default()
            })
        )
    }

    #[test]
    fn test_should_parse_structure_with_array_field() {
        let source = r#"
            typedef struct {
                 int                       structSize;
                 float                     alt_msl;
                 const char *              name;
                 XPLMWeatherInfoWinds_t    wind_layers[XPLM_NUM_WIND_LAYERS];
            } XPLMWeatherInfo_t;
        "#;
        assert_eq!(
            parse(source),
            Ok(Header {
                structures: vec![Structure {
                    name: "XPLMWeatherInfo_t".into(),
                    fields: vec![
                        Field {
                            as_const: None,
                            field_type: FundamentalType("int".into()),
                            pointer: None,
                            name: "structSize".into(),
                            as_array: None
                        },
                        Field {
                            as_const: None,
                            field_type: FundamentalType("float".into()),
                            pointer: None,
                            name: "alt_msl".into(),
                            as_array: None
                        },
                        Field {
                            as_const: Some("const".into()),
                            field_type: FundamentalType("char".into()),
                            pointer: Some(NormalPointer("*".into())),
                            name: "name".into(),
                            as_array: None
                        },
                        Field {
                            as_const: None,
                            field_type: UserType("XPLMWeatherInfoWinds_t".into()),
                            pointer: None,
                            name: "wind_layers".into(),
                            as_array: Some("[XPLM_NUM_WIND_LAYERS]".into())
                        }
                    ]
                }],
                ..Header::default()
            })
        )
    }

    #[test]
    fn test_should_parse_callback() {
        let source = r#"
            typedef int (* XPLMCameraControl_f)(
                                     XPLMCameraPosition_t * outCameraPosition,    /* Can be NULL */
                                     int                  inIsLosingControl,
                                     void *               inRefcon);
        "#;
        assert_eq!(
            parse(source),
            Ok(Header {
                callbacks: vec![Callback {
                    return_const: None,
                    return_type: FundamentalType("int".into()),
                    pointer: None,
                    name: "XPLMCameraControl_f".into(),
                    arguments: vec![
                        argument(UserType("XPLMCameraPosition_t".into()), true, "outCameraPosition"),
                        argument(FundamentalType("int".into()), false, "inIsLosingControl"),
                        argument(FundamentalType("void".into()), true, "inRefcon"),
                    ],
                    varargs: None
                }],
                ..Header::default()
            })
        )
    }

    #[test]
    fn test_should_parse_function_without_arguments() {
        let source = "XPLM_API void       XPLMDontControlCamera(void);";
        assert_eq!(
            parse(source),
            Ok(Header {
                functions: vec![Function {
                    return_const: None,
                    return_type: FundamentalType("void".into()),
                    pointer: None,
                    name: "XPLMDontControlCamera".into(),
                    arguments: vec![],
                    varargs: None
                }],
                ..Header::default()
            })
        )
    }

    #[test]
    fn test_should_parse_function_returning_pointer() {
        let source = r#"
            XPLM_API FMOD_CHANNEL* XPLMPlayPCMOnBus(
                                     void *               audioBuffer,
                                     uint32_t             bufferSize,
                                     FMOD_SOUND_FORMAT    soundFormat);
            XPLM_API FMOD_RESULT XPLMGetFMODStudio(FMOD_STUDIO_SYSTEM** outFMODStudioSystem);
        "#;
        assert_eq!(
            parse(source),
            Ok(Header {
                functions: vec![
                    Function {
                        return_const: None,
                        return_type: UserType("FMOD_CHANNEL".into()),
                        pointer: Some(NormalPointer("*".into())),
                        name: "XPLMPlayPCMOnBus".into(),
                        arguments: vec![
                            argument(FundamentalType("void".into()), true, "audioBuffer"),
                            argument(FundamentalType("uint32_t".into()), false, "bufferSize"),
                            argument(UserType("FMOD_SOUND_FORMAT".into()), false, "soundFormat"),
                        ],
                        varargs: None
                    },
                    Function {
                        return_const: None,
                        return_type: UserType("FMOD_RESULT".into()),
                        pointer: None,
                        name: "XPLMGetFMODStudio".into(),
                        arguments: vec![Argument {
                            as_const: None,
                            argument_type: UserType("FMOD_STUDIO_SYSTEM".into()),
                            pointer: Some(DoublePointer("**".into())),
                            name: "outFMODStudioSystem".into(),
                            as_array: None
                        }],
                        varargs: None
                    }
                ],
                ..Header::default()
            })
        )
    }

    #[test]
    fn test_should_parse_widget_function_with_const_double_pointer() {
        let source = r#"
            WIDGET_API XPWidgetID XPCreateWidget(
                                     int                  inLeft,
                                     const char *         inDescriptor,
                                     const char **        inNames);
        "#;
        let header = parse(source).unwrap();
        let function = &header.functions[0];
        assert_eq!(function.name, "XPCreateWidget");
        assert_eq!(function.return_type, UserType("XPWidgetID".into()));
        assert_eq!(function.arguments[1].as_const, Some("const".into()));
        assert_eq!(
            function.arguments[2].pointer,
            Some(DoublePointer("**".into()))
        );
    }

    #[test]
    fn test_should_parse_exported_functions_of_both_libraries() {
        let source = r#"
            XPLM_API int XPLMGetMyID(void);
            WIDGET_API void XPDestroyWidget(XPWidgetID inWidget, int inDestroyChildren);
        "#;
        let header = parse(source).unwrap();
        let names: Vec<&str> = header
            .functions
            .iter()
            .map(|function| function.name.as_str())
            .collect();
        assert_eq!(names, vec!["XPLMGetMyID", "XPDestroyWidget"]);
        assert_eq!(header.functions[0].return_type, FundamentalType("int".into()));
        assert_eq!(
            header.functions[1].arguments,
            vec![
                argument(UserType("XPWidgetID".into()), false, "inWidget"),
                argument(FundamentalType("int".into()), false, "inDestroyChildren"),
            ]
        );
    }

    #[test]
    fn test_should_not_take_longer_identifier_for_export_macro() {
        let source = "XPLM_APIX int XPLMGetMyID(void);";
        let header = parse(source).unwrap();
        assert!(header.functions.is_empty());
    }

    #[test]
    fn test_should_normalize_multi_word_fundamental_types() {
        let source = "typedef unsigned    long long XPLMHugeValue;";
        let header = parse(source).unwrap();
        assert_eq!(
            header.type_aliases[0].base_type,
            FundamentalType("unsigned long long".into())
        );
    }

    #[test]
    fn test_should_skip_unrecognised_declarations() {
        let source = r#"
            static inline int broken[] = { 1, 2 };
            typedef int XPLMMenuID;
        "#;
        let header = parse(source).unwrap();
        assert_eq!(header.type_aliases.len(), 1);
        assert_eq!(header.type_aliases[0].name, "XPLMMenuID");
    }
}
