//! Converter command templates
//!
//! A template is a list of argument tokens. Each token may contain `{name}`
//! placeholders; `{{` and `}}` stand for literal braces. `input` and `output`
//! are always available and expand to paths, other names come from the
//! converter's extra arguments.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::ffi::OsString;
use std::fmt;
use std::path::Path;

/// Placeholder replaced by the source file path
pub const INPUT_KEY: &str = "input";

/// Placeholder replaced by the staging output path
pub const OUTPUT_KEY: &str = "output";

/// Extra placeholder value from the configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
	Integer(i64),
	Float(f64),
	Text(String),
}

impl fmt::Display for ArgValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ArgValue::Integer(i) => write!(f, "{}", i),
			ArgValue::Float(x) => write!(f, "{}", x),
			ArgValue::Text(s) => f.write_str(s),
		}
	}
}

/// Template parsing and rendering errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
	/// `{` without a matching `}`, or a stray `}`
	Unbalanced { token: String },
	/// `{}` with no name inside
	EmptyPlaceholder { token: String },
	/// Placeholder that nothing provides a value for
	UnknownPlaceholder { name: String },
	/// Extra argument that shadows a built-in placeholder
	Reserved { name: String },
}

impl fmt::Display for TemplateError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TemplateError::Unbalanced { token } => write!(f, "unbalanced braces in {:?}", token),
			TemplateError::EmptyPlaceholder { token } => {
				write!(f, "empty placeholder in {:?}", token)
			}
			TemplateError::UnknownPlaceholder { name } => {
				write!(f, "placeholder {{{}}} has no value", name)
			}
			TemplateError::Reserved { name } => {
				write!(f, "argument {:?} is reserved and cannot be redefined", name)
			}
		}
	}
}

impl Error for TemplateError {}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
	Literal(String),
	Placeholder(String),
}

/// Parsed converter command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
	tokens: Vec<Vec<Segment>>,
}

impl CommandTemplate {
	/// Parse raw tokens, rejecting malformed braces
	pub fn parse<I, S>(tokens: I) -> Result<Self, TemplateError>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let tokens = tokens
			.into_iter()
			.map(|t| parse_token(t.as_ref()))
			.collect::<Result<Vec<_>, _>>()?;
		Ok(CommandTemplate { tokens })
	}

	/// Names of every placeholder used, in order of first appearance
	pub fn placeholders(&self) -> Vec<&str> {
		let mut names: Vec<&str> = Vec::new();
		for seg in self.tokens.iter().flatten() {
			if let Segment::Placeholder(name) = seg {
				if !names.contains(&name.as_str()) {
					names.push(name);
				}
			}
		}
		names
	}

	/// Check every placeholder can be satisfied by `args` plus the built-ins
	pub fn check(&self, args: &BTreeMap<String, ArgValue>) -> Result<(), TemplateError> {
		for name in [INPUT_KEY, OUTPUT_KEY] {
			if args.contains_key(name) {
				return Err(TemplateError::Reserved { name: name.to_string() });
			}
		}
		for name in self.placeholders() {
			if name != INPUT_KEY && name != OUTPUT_KEY && !args.contains_key(name) {
				return Err(TemplateError::UnknownPlaceholder { name: name.to_string() });
			}
		}
		Ok(())
	}

	/// Build the argument vector for one conversion
	pub fn render(
		&self,
		input: &Path,
		output: &Path,
		args: &BTreeMap<String, ArgValue>,
	) -> Result<Vec<OsString>, TemplateError> {
		let mut argv = Vec::with_capacity(self.tokens.len());
		for token in &self.tokens {
			let mut arg = OsString::new();
			for seg in token {
				match seg {
					Segment::Literal(s) => arg.push(s),
					Segment::Placeholder(name) if name == INPUT_KEY => arg.push(input),
					Segment::Placeholder(name) if name == OUTPUT_KEY => arg.push(output),
					Segment::Placeholder(name) => match args.get(name) {
						Some(value) => arg.push(value.to_string()),
						None => {
							return Err(TemplateError::UnknownPlaceholder { name: name.clone() })
						}
					},
				}
			}
			argv.push(arg);
		}
		Ok(argv)
	}
}

fn parse_token(token: &str) -> Result<Vec<Segment>, TemplateError> {
	let unbalanced = || TemplateError::Unbalanced { token: token.to_string() };
	let mut segments = Vec::new();
	let mut literal = String::new();
	let mut chars = token.chars().peekable();

	while let Some(c) = chars.next() {
		match c {
			'{' if chars.peek() == Some(&'{') => {
				chars.next();
				literal.push('{');
			}
			'}' if chars.peek() == Some(&'}') => {
				chars.next();
				literal.push('}');
			}
			'{' => {
				let mut name = String::new();
				loop {
					match chars.next() {
						Some('}') => break,
						Some('{') | None => return Err(unbalanced()),
						Some(c) => name.push(c),
					}
				}
				if name.trim().is_empty() {
					return Err(TemplateError::EmptyPlaceholder { token: token.to_string() });
				}
				if !literal.is_empty() {
					segments.push(Segment::Literal(std::mem::take(&mut literal)));
				}
				segments.push(Segment::Placeholder(name.trim().to_string()));
			}
			'}' => return Err(unbalanced()),
			c => literal.push(c),
		}
	}
	if !literal.is_empty() || segments.is_empty() {
		segments.push(Segment::Literal(literal));
	}
	Ok(segments)
}


// vim: ts=4
