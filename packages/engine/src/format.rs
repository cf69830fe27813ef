//! Member-path parser.
//!
//! A member path chains property and method references, with `%x`
//! placeholders standing in for caller-supplied arguments:
//!
//! ```text
//! .Filters(%d).Properties(%S).Value = %d
//! ```
//!
//! Segments are separated by `.`; each is a name followed by zero or more
//! parenthesised argument groups; whitespace around separators is ignored.
//! An optional trailing `= %x` turns the last segment into an assignment.
//! The parser makes a single left-to-right pass
//! and records every placeholder in the order the marshaller must read
//! arguments for them.

use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use latebind_core::{date, Cell, CellType, CoerceError};

use crate::error::ParseError;
use crate::MarshalMode;

/// A placeholder identifier: what native argument to read and what cell
/// type it produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Placeholder {
    /// `%d` signed 32-bit integer.
    Int,
    /// `%u` unsigned 32-bit integer.
    UInt,
    /// `%e` status code.
    ErrorCode,
    /// `%b` boolean.
    Bool,
    /// `%f` double.
    Double,
    /// `%v` any cell, passed through unchanged.
    Generic,
    /// `%B` raw binary.
    Blob,
    /// `%s` narrow (UTF-8) string.
    Narrow,
    /// `%S` wide (UTF-16) string.
    Wide,
    /// `%T` narrow or wide depending on the marshal mode.
    Text,
    /// `%o` object reference.
    Object,
    /// `%O` object reference that may be null.
    NullableObject,
    /// `%t` Unix time in seconds.
    UnixTime,
    /// `%W` calendar date/time.
    DateTime,
    /// `%D` automation date (fractional days).
    OleDate,
    /// `%a` typed array.
    Array,
    /// `%m` omitted optional argument; reads nothing.
    Missing,
    /// `%n` member name taken from an object argument.
    Name,
}

impl Placeholder {
    /// The identifier alphabet, as listed in diagnostics.
    pub const IDENTIFIERS: &'static str = "d/u/e/b/f/v/B/s/S/T/o/O/t/W/D/a/m/n";

    pub fn from_identifier(c: char) -> Option<Self> {
        let placeholder = match c {
            'd' => Placeholder::Int,
            'u' => Placeholder::UInt,
            'e' => Placeholder::ErrorCode,
            'b' => Placeholder::Bool,
            'f' => Placeholder::Double,
            'v' => Placeholder::Generic,
            'B' => Placeholder::Blob,
            's' => Placeholder::Narrow,
            'S' => Placeholder::Wide,
            'T' => Placeholder::Text,
            'o' => Placeholder::Object,
            'O' => Placeholder::NullableObject,
            't' => Placeholder::UnixTime,
            'W' => Placeholder::DateTime,
            'D' => Placeholder::OleDate,
            'a' => Placeholder::Array,
            'm' => Placeholder::Missing,
            'n' => Placeholder::Name,
            _ => return None,
        };
        Some(placeholder)
    }

    pub fn identifier(self) -> char {
        match self {
            Placeholder::Int => 'd',
            Placeholder::UInt => 'u',
            Placeholder::ErrorCode => 'e',
            Placeholder::Bool => 'b',
            Placeholder::Double => 'f',
            Placeholder::Generic => 'v',
            Placeholder::Blob => 'B',
            Placeholder::Narrow => 's',
            Placeholder::Wide => 'S',
            Placeholder::Text => 'T',
            Placeholder::Object => 'o',
            Placeholder::NullableObject => 'O',
            Placeholder::UnixTime => 't',
            Placeholder::DateTime => 'W',
            Placeholder::OleDate => 'D',
            Placeholder::Array => 'a',
            Placeholder::Missing => 'm',
            Placeholder::Name => 'n',
        }
    }

    /// Whether the placeholder reads a native argument.
    pub fn consumes_argument(self) -> bool {
        self != Placeholder::Missing
    }

    /// Parse an output identifier such as `"%d"` for a get operation.
    pub fn parse_output(text: &str) -> Result<Self, ParseError> {
        let invalid = || ParseError::InvalidOutput {
            text: text.to_string(),
        };
        let mut chars = text.trim().chars();
        let (Some('%'), Some(c), None) = (chars.next(), chars.next(), chars.next()) else {
            return Err(invalid());
        };
        match Placeholder::from_identifier(c) {
            Some(Placeholder::Missing | Placeholder::Name) => Err(invalid()),
            Some(placeholder) => Ok(placeholder),
            None => {
                report_invalid_identifier(c);
                Err(ParseError::UnknownIdentifier {
                    identifier: c,
                    position: 1,
                })
            }
        }
    }

    /// The cell type a get operation with this output identifier returns.
    pub fn output_type(self) -> Option<CellType> {
        let cell_type = match self {
            Placeholder::Int => CellType::I32,
            Placeholder::UInt => CellType::U32,
            Placeholder::ErrorCode => CellType::Error,
            Placeholder::Bool => CellType::Bool,
            Placeholder::Double | Placeholder::OleDate | Placeholder::UnixTime => CellType::Double,
            Placeholder::Generic => CellType::Any,
            Placeholder::Blob => CellType::Blob,
            Placeholder::Narrow | Placeholder::Wide | Placeholder::Text => CellType::String,
            Placeholder::Object | Placeholder::NullableObject => CellType::Object,
            Placeholder::DateTime => CellType::Date,
            Placeholder::Array => CellType::Array,
            Placeholder::Missing | Placeholder::Name => return None,
        };
        Some(cell_type)
    }

    /// Convert a member's result for this output identifier.
    pub fn coerce_output(self, cell: Cell) -> Result<Cell, CoerceError> {
        match (self, cell) {
            (Placeholder::NullableObject, Cell::Empty) => Ok(Cell::Empty),
            (Placeholder::OleDate, cell) => cell.coerce(CellType::Date)?.coerce(CellType::Double),
            // whole seconds since the Unix epoch
            (Placeholder::UnixTime, cell) => match cell.coerce(CellType::Date)? {
                Cell::Date(value) => Ok(Cell::Double(date::to_unix(value) as f64)),
                other => Err(CoerceError::Unsupported {
                    from: other.cell_type(),
                    to: CellType::Double,
                }),
            },
            (placeholder, cell) => match placeholder.output_type() {
                Some(cell_type) => cell.coerce(cell_type),
                None => Err(CoerceError::Unsupported {
                    from: cell.cell_type(),
                    to: CellType::Any,
                }),
            },
        }
    }

    /// `%T` takes the shape the marshal mode selects.
    pub fn resolve_text(self, mode: MarshalMode) -> Placeholder {
        match (self, mode) {
            (Placeholder::Text, MarshalMode::Narrow) => Placeholder::Narrow,
            (Placeholder::Text, MarshalMode::Wide) => Placeholder::Wide,
            (other, _) => other,
        }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.identifier())
    }
}

/// What a segment does with its arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentKind {
    /// `Name` with no argument list.
    Property,
    /// `Name(args)`.
    Call,
    /// `(args)` applied to the previous result's default member.
    Index,
}

/// How a segment names its member.
#[derive(Clone, Debug, PartialEq)]
pub enum MemberName {
    /// Spelled out in the path.
    Named(String),
    /// Taken from the `%n` argument at this placeholder index.
    Indirect { index: usize },
    /// The default member (an extra argument group).
    Default,
}

/// One argument position.
#[derive(Clone, Debug, PartialEq)]
pub enum Slot {
    /// Filled from the caller's arguments; `index` counts placeholders
    /// left to right across the whole path.
    Placeholder { id: Placeholder, index: usize },
    /// A literal written inline in the path.
    Literal(Cell),
}

/// One step in a member-access chain.
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub name: MemberName,
    pub args: Vec<Slot>,
    pub terminal: bool,
}

/// A parsed member path.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedPath {
    /// At least one segment; only the last is terminal.
    pub segments: Vec<Segment>,
    /// The trailing `= %x` of a put operation.
    pub value: Option<Slot>,
    /// Every placeholder in reading order.
    pub placeholders: Vec<Placeholder>,
}

impl ParsedPath {
    /// Number of native arguments the path reads.
    pub fn expected_arguments(&self) -> usize {
        self.placeholders
            .iter()
            .filter(|p| p.consumes_argument())
            .count()
    }

    pub fn is_put(&self) -> bool {
        self.value.is_some()
    }
}

fn report_invalid_identifier(identifier: char) {
    if cfg!(debug_assertions) {
        log::warn!(
            "The format string or output identifier contained the invalid identifier '{}'. \
             The valid identifiers are \"{}\". Each % character should be followed by a \
             valid identifier. Identifiers are case sensitive.",
            identifier,
            Placeholder::IDENTIFIERS
        );
    }
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Parse a member path.
///
/// # Examples
///
/// ```rust
/// use latebind::format::{parse, Placeholder};
///
/// let path = parse(".Filters(%d).Properties(%S).Value = %d").unwrap();
/// assert_eq!(path.segments.len(), 3);
/// assert_eq!(
///     path.placeholders,
///     vec![Placeholder::Int, Placeholder::Wide, Placeholder::Int]
/// );
/// assert!(path.is_put());
/// ```
pub fn parse(path: &str) -> Result<ParsedPath, ParseError> {
    Parser::new(path).parse()
}

struct Parser<'a> {
    src: &'a str,
    chars: Peekable<CharIndices<'a>>,
    placeholders: Vec<Placeholder>,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Parser {
            src,
            chars: src.char_indices().peekable(),
            placeholders: Vec::new(),
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn offset(&mut self) -> usize {
        self.chars.peek().map_or(self.src.len(), |&(i, _)| i)
    }

    fn bump(&mut self) -> Option<char> {
        self.chars.next().map(|(_, c)| c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn unexpected(&mut self, expected: &'static str) -> ParseError {
        let position = self.offset();
        let found = match self.peek() {
            Some(c) => format!("'{}'", c),
            None => "end of path".to_string(),
        };
        ParseError::Unexpected {
            expected,
            found,
            position,
        }
    }

    fn parse(mut self) -> Result<ParsedPath, ParseError> {
        self.skip_whitespace();
        if self.peek() == Some('.') {
            self.bump();
            self.skip_whitespace();
        }
        if self.peek().is_none() {
            return Err(ParseError::Empty);
        }

        let mut segments = Vec::new();
        loop {
            self.segment(&mut segments)?;
            self.skip_whitespace();
            if self.peek() == Some('.') {
                self.bump();
                self.skip_whitespace();
            } else {
                break;
            }
        }

        let value = if self.peek() == Some('=') {
            self.bump();
            self.skip_whitespace();
            let slot = self.slot("assigned value")?;
            self.skip_whitespace();
            Some(slot)
        } else {
            None
        };

        if self.peek().is_some() {
            return Err(self.unexpected("'.', '(' or '='"));
        }

        if let Some(last) = segments.last_mut() {
            last.terminal = true;
        }

        Ok(ParsedPath {
            segments,
            value,
            placeholders: self.placeholders,
        })
    }

    /// A name plus its argument groups; extra groups become index segments.
    fn segment(&mut self, segments: &mut Vec<Segment>) -> Result<(), ParseError> {
        let name = self.member_name()?;

        let mut groups = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() != Some('(') {
                break;
            }
            groups.push(self.argument_group()?);
        }

        let mut groups = groups.into_iter();
        match groups.next() {
            Some(args) => segments.push(Segment {
                kind: SegmentKind::Call,
                name,
                args,
                terminal: false,
            }),
            None => segments.push(Segment {
                kind: SegmentKind::Property,
                name,
                args: Vec::new(),
                terminal: false,
            }),
        }
        for args in groups {
            segments.push(Segment {
                kind: SegmentKind::Index,
                name: MemberName::Default,
                args,
                terminal: false,
            });
        }
        Ok(())
    }

    fn member_name(&mut self) -> Result<MemberName, ParseError> {
        if self.peek() == Some('%') {
            return match self.placeholder()? {
                (Placeholder::Name, index) => Ok(MemberName::Indirect { index }),
                (other, _) => Err(ParseError::Misplaced {
                    identifier: other.identifier(),
                    context: "a member name",
                }),
            };
        }

        let start = self.offset();
        match self.peek() {
            Some(c) if is_name_start(c) => {
                self.bump();
            }
            _ => return Err(self.unexpected("member name")),
        }
        while self.peek().is_some_and(is_name_continue) {
            self.bump();
        }
        let end = self.offset();
        Ok(MemberName::Named(self.src[start..end].to_string()))
    }

    fn argument_group(&mut self) -> Result<Vec<Slot>, ParseError> {
        let open = self.offset();
        self.bump();
        let mut args = Vec::new();

        self.skip_whitespace();
        if self.peek() == Some(')') {
            self.bump();
            return Ok(args);
        }

        loop {
            if self.peek().is_none() {
                return Err(ParseError::UnterminatedArguments { position: open });
            }
            args.push(self.slot("argument")?);
            self.skip_whitespace();
            match self.peek() {
                Some(',') => {
                    self.bump();
                    self.skip_whitespace();
                }
                Some(')') => {
                    self.bump();
                    return Ok(args);
                }
                None => return Err(ParseError::UnterminatedArguments { position: open }),
                Some(_) => return Err(self.unexpected("',' or ')'")),
            }
        }
    }

    fn placeholder(&mut self) -> Result<(Placeholder, usize), ParseError> {
        self.bump();
        let position = self.offset();
        let identifier = match self.bump() {
            Some(c) => c,
            None => return Err(self.unexpected("format identifier")),
        };
        let placeholder = match Placeholder::from_identifier(identifier) {
            Some(p) => p,
            None => {
                report_invalid_identifier(identifier);
                return Err(ParseError::UnknownIdentifier {
                    identifier,
                    position,
                });
            }
        };
        let index = self.placeholders.len();
        self.placeholders.push(placeholder);
        Ok((placeholder, index))
    }

    fn slot(&mut self, context: &'static str) -> Result<Slot, ParseError> {
        match self.peek() {
            Some('%') => {
                let (id, index) = self.placeholder()?;
                if id == Placeholder::Missing && context == "assigned value" {
                    return Err(ParseError::Misplaced {
                        identifier: id.identifier(),
                        context,
                    });
                }
                Ok(Slot::Placeholder { id, index })
            }
            Some('"') => self.string_literal().map(Slot::Literal),
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' => {
                self.number_literal().map(Slot::Literal)
            }
            Some(c) if is_name_start(c) => self.keyword_literal().map(Slot::Literal),
            _ => Err(self.unexpected(context)),
        }
    }

    fn string_literal(&mut self) -> Result<Cell, ParseError> {
        let position = self.offset();
        self.bump();
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(Cell::String(text)),
                Some('\\') => match self.bump() {
                    Some(c) => text.push(c),
                    None => return Err(ParseError::UnterminatedString { position }),
                },
                Some(c) => text.push(c),
                None => return Err(ParseError::UnterminatedString { position }),
            }
        }
    }

    fn number_literal(&mut self) -> Result<Cell, ParseError> {
        let start = self.offset();
        self.bump();
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
        {
            self.bump();
        }
        let end = self.offset();
        let text = &self.src[start..end];
        let invalid = || ParseError::InvalidLiteral {
            text: text.to_string(),
            position: start,
        };

        if text.contains(['.', 'e', 'E']) {
            text.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Cell::Double)
                .ok_or_else(invalid)
        } else {
            text.parse::<i32>().map(Cell::I32).map_err(|_| invalid())
        }
    }

    fn keyword_literal(&mut self) -> Result<Cell, ParseError> {
        let start = self.offset();
        while self.peek().is_some_and(is_name_continue) {
            self.bump();
        }
        let end = self.offset();
        match &self.src[start..end] {
            "true" => Ok(Cell::Bool(true)),
            "false" => Ok(Cell::Bool(false)),
            text => Err(ParseError::InvalidLiteral {
                text: text.to_string(),
                position: start,
            }),
        }
    }
}
