//! # Codec Descriptors
//!
//! Declarative description of every external codec: executable name, file
//! extension, argument template, default flags and the optional probe hooks
//! (version string, build-variant support). No behaviour lives here besides
//! template parsing and rendering; locating is done by `CodecLocator`.

use crate::error::CodecError;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::path::Path;

/// Role a descriptor plays in a conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecRole {
    Decoder,
    Encoder,
}

impl fmt::Display for CodecRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decoder => write!(f, "decoder"),
            Self::Encoder => write!(f, "encoder"),
        }
    }
}

/// One token of an argument template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgToken {
    /// Resolved path of the executable
    Executable,
    /// Source file (decoders)
    Input,
    /// Temporary output file (encoders)
    Output,
    /// Active flags, split on whitespace; may expand to zero tokens
    Flags,
    Literal(String),
}

impl ArgToken {
    fn placeholder(&self) -> Option<&'static str> {
        match self {
            Self::Executable => Some("exe"),
            Self::Input => Some("input"),
            Self::Output => Some("output"),
            Self::Flags => Some("flags"),
            Self::Literal(_) => None,
        }
    }
}

fn lit(value: &str) -> ArgToken {
    ArgToken::Literal(value.to_string())
}

/// Structured argument list with named substitution points.
///
/// Paths are substituted as whole arguments, so no shell quoting is involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgTemplate {
    tokens: Vec<ArgToken>,
}

/// Values substituted into an `ArgTemplate`
#[derive(Debug, Clone, Copy)]
pub struct TemplateValues<'a> {
    pub executable: &'a Path,
    pub input: Option<&'a Path>,
    pub output: Option<&'a Path>,
    pub flags: &'a str,
}

/// A rendered invocation ready to be handed to `Command`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl CommandLine {
    /// Human readable rendering for logs
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|part| part.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl ArgTemplate {
    /// Build a template from tokens. The first token must be the executable.
    pub fn from_tokens(tokens: Vec<ArgToken>) -> Result<Self, CodecError> {
        let template = Self { tokens };
        template.check()?;
        Ok(template)
    }

    /// Parse a whitespace separated template such as `{exe} -c -d {input} {flags}`
    pub fn parse(template: &str) -> Result<Self, CodecError> {
        let mut tokens = Vec::new();

        for part in template.split_whitespace() {
            let token = match part {
                "{exe}" => ArgToken::Executable,
                "{input}" => ArgToken::Input,
                "{output}" => ArgToken::Output,
                "{flags}" => ArgToken::Flags,
                other if other.contains('{') || other.contains('}') => {
                    return Err(CodecError::invalid_template(
                        template,
                        format!("unknown or embedded placeholder '{}'", other),
                    ));
                }
                other => lit(other),
            };
            tokens.push(token);
        }

        Self::from_tokens(tokens).map_err(|e| match e {
            CodecError::InvalidTemplate { reason, .. } => CodecError::invalid_template(template, reason),
            other => other,
        })
    }

    fn check(&self) -> Result<(), CodecError> {
        if self.tokens.first() != Some(&ArgToken::Executable) {
            return Err(CodecError::invalid_template(self.to_string(), "must start with {exe}"));
        }
        let exe_count = self.tokens.iter().filter(|t| **t == ArgToken::Executable).count();
        if exe_count != 1 {
            return Err(CodecError::invalid_template(self.to_string(), "{exe} must appear exactly once"));
        }
        Ok(())
    }

    /// Whether the template contains the given placeholder
    pub fn uses(&self, token: &ArgToken) -> bool {
        self.tokens.contains(token)
    }

    /// Substitute values into the template
    pub fn render(&self, codec: &str, values: &TemplateValues<'_>) -> Result<CommandLine, CodecError> {
        let missing = |placeholder: &'static str| CodecError::MissingPlaceholderValue {
            codec: codec.to_string(),
            placeholder,
        };

        let mut args = Vec::new();
        for token in self.tokens.iter().skip(1) {
            match token {
                ArgToken::Executable => args.push(values.executable.as_os_str().to_os_string()),
                ArgToken::Input => {
                    let input = values.input.ok_or_else(|| missing("input"))?;
                    args.push(input.as_os_str().to_os_string());
                }
                ArgToken::Output => {
                    let output = values.output.ok_or_else(|| missing("output"))?;
                    args.push(output.as_os_str().to_os_string());
                }
                ArgToken::Flags => args.extend(values.flags.split_whitespace().map(OsString::from)),
                ArgToken::Literal(value) => args.push(OsString::from(value)),
            }
        }

        Ok(CommandLine {
            program: values.executable.as_os_str().to_os_string(),
            args,
        })
    }
}

impl fmt::Display for ArgTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .tokens
            .iter()
            .map(|t| match (t.placeholder(), t) {
                (Some(name), _) => format!("{{{}}}", name),
                (None, ArgToken::Literal(value)) => value.clone(),
                (None, _) => String::new(),
            })
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}

/// How to obtain a version string from a located executable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionProbe {
    None,
    /// Run with `args` and keep the first non-empty output line
    FirstLine { args: Vec<String> },
}

/// How to verify that a located executable is the right build variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupportProbe {
    None,
    /// Run with `args`; a non-zero status means unsupported
    ExitsZero { args: Vec<String> },
    /// Run with `args`; must exit zero and mention `feature` in its output
    ListsFeature { args: Vec<String>, feature: String },
}

/// Immutable description of one codec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecDescriptor {
    pub name: String,
    pub executable_name: String,
    /// Includes the leading dot
    pub file_extension: String,
    pub arguments: ArgTemplate,
    pub default_flags: String,
    pub version_probe: VersionProbe,
    pub support_probe: SupportProbe,
}

impl CodecDescriptor {
    pub fn new(
        name: &str,
        executable_name: &str,
        file_extension: &str,
        arguments: ArgTemplate,
        default_flags: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            executable_name: executable_name.to_string(),
            file_extension: normalize_extension(file_extension),
            arguments,
            default_flags: default_flags.to_string(),
            version_probe: VersionProbe::None,
            support_probe: SupportProbe::None,
        }
    }

    pub fn with_version_probe(mut self, args: &[&str]) -> Self {
        self.version_probe = VersionProbe::FirstLine {
            args: args.iter().map(|a| a.to_string()).collect(),
        };
        self
    }

    pub fn with_support_probe(mut self, probe: SupportProbe) -> Self {
        self.support_probe = probe;
        self
    }

    /// Build a descriptor from a user supplied definition
    pub fn from_definition(definition: &CodecDefinition, role: CodecRole) -> Result<Self, CodecError> {
        let arguments = ArgTemplate::parse(&definition.template)?;

        let required = match role {
            CodecRole::Decoder => ArgToken::Input,
            CodecRole::Encoder => ArgToken::Output,
        };
        if !arguments.uses(&required) {
            return Err(CodecError::invalid_template(
                &definition.template,
                format!("a {} template must contain {{{}}}", role, required.placeholder().unwrap_or_default()),
            ));
        }

        let mut descriptor = Self::new(
            &definition.name,
            &definition.executable,
            &definition.extension,
            arguments,
            &definition.flags,
        );
        if let Some(ref args) = definition.version_args {
            descriptor.version_probe = VersionProbe::FirstLine { args: args.clone() };
        }
        Ok(descriptor)
    }
}

fn normalize_extension(extension: &str) -> String {
    if extension.starts_with('.') {
        extension.to_string()
    } else {
        format!(".{}", extension)
    }
}

/// Serializable codec definition, used for user-defined codecs in the settings file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecDefinition {
    pub name: String,
    pub executable: String,
    pub extension: String,
    /// e.g. `{exe} -d -c {input} {flags}`
    pub template: String,
    #[serde(default)]
    pub flags: String,
    #[serde(default)]
    pub version_args: Option<Vec<String>>,
}

/// Read-only table of every known codec, built once at startup and handed to the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecTable {
    pub decoders: Vec<CodecDescriptor>,
    pub encoders: Vec<CodecDescriptor>,
}

impl CodecTable {
    pub fn new(decoders: Vec<CodecDescriptor>, encoders: Vec<CodecDescriptor>) -> Self {
        Self { decoders, encoders }
    }

    /// Codecs shipped with the tool, in selection order
    pub fn builtin() -> Result<Self, CodecError> {
        use ArgToken::{Executable as Exe, Flags, Input, Output};

        let decoders = vec![
            CodecDescriptor::new(
                "flac",
                "flac",
                ".flac",
                ArgTemplate::from_tokens(vec![Exe, lit("-s"), lit("-c"), lit("-d"), Input, Flags])?,
                "",
            )
            .with_version_probe(&["-v"]),
            CodecDescriptor::new("wav", "cat", ".wav", ArgTemplate::from_tokens(vec![Exe, Input, Flags])?, ""),
            // Windows only, never verified against a real install
            CodecDescriptor::new("winwav", "type", ".wav", ArgTemplate::from_tokens(vec![Exe, Input, Flags])?, ""),
        ];

        let encoders = vec![
            CodecDescriptor::new(
                "mp3",
                "lame",
                ".mp3",
                ArgTemplate::from_tokens(vec![Exe, lit("-"), Output, lit("--silent"), Flags])?,
                "-V 0",
            )
            .with_version_probe(&["--version"]),
            CodecDescriptor::new(
                "ogg",
                "oggenc",
                ".ogg",
                ArgTemplate::from_tokens(vec![Exe, lit("-"), lit("-o"), Output, Flags])?,
                "-q 6",
            )
            .with_version_probe(&["--version"]),
            CodecDescriptor::new(
                "aac",
                "faac",
                ".m4a",
                ArgTemplate::from_tokens(vec![Exe, lit("-"), lit("-w"), lit("-o"), Output, Flags])?,
                "-q 170",
            ),
            CodecDescriptor::new(
                "avconv-fdkaac",
                "avconv",
                ".m4a",
                ArgTemplate::from_tokens(vec![
                    Exe,
                    lit("-i"),
                    lit("-"),
                    lit("-c:a"),
                    lit("libfdk_aac"),
                    lit("-flags"),
                    Flags,
                    Output,
                ])?,
                "+qscale -global_quality 5 -afterburner 1",
            ),
            // libfdk_aac is not compiled into stock ffmpeg builds
            CodecDescriptor::new(
                "ffmpeg-fdkaac",
                "ffmpeg",
                ".m4a",
                ArgTemplate::from_tokens(vec![
                    Exe,
                    lit("-v"),
                    lit("0"),
                    lit("-i"),
                    lit("-"),
                    lit("-c:a"),
                    lit("libfdk_aac"),
                    Flags,
                    Output,
                ])?,
                "-vbr 3",
            )
            .with_support_probe(SupportProbe::ListsFeature {
                args: vec!["-v".to_string(), "0".to_string(), "-encoders".to_string()],
                feature: "libfdk_aac".to_string(),
            })
            .with_version_probe(&["-v", "0", "-version"]),
        ];

        Ok(Self::new(decoders, encoders))
    }

    /// Append user-defined codecs after the built-in ones
    pub fn with_definitions(
        mut self,
        decoders: &[CodecDefinition],
        encoders: &[CodecDefinition],
    ) -> Result<Self, CodecError> {
        for definition in decoders {
            self.decoders.push(CodecDescriptor::from_definition(definition, CodecRole::Decoder)?);
        }
        for definition in encoders {
            self.encoders.push(CodecDescriptor::from_definition(definition, CodecRole::Encoder)?);
        }
        Ok(self)
    }

    pub fn descriptors(&self, role: CodecRole) -> &[CodecDescriptor] {
        match role {
            CodecRole::Decoder => &self.decoders,
            CodecRole::Encoder => &self.encoders,
        }
    }
}
