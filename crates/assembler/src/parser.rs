//! Line parser for the Ferrite-32 assembly grammar.
//!
//! Grammar per line: an optional `name:` label, then an optional segment
//! directive (`.text`, `.static`, `.org`, `.poke`), data directive
//! (`db`/`dw`/`dd`/`df`), or instruction. Registers are written `%Rn`,
//! register-indirect operands `[%Rn]`, immediates as bare decimal or
//! `0x` hex literals, single-quoted characters, or float literals; label
//! names stand for direct addresses. Comments start with `;`.
//!
//! Operand count and kinds are validated here against the shared ISA
//! descriptors, so a mismatched instruction never reaches pass 1.

use ferrite_core::{lookup_mnemonic, InstructionDescriptor, OperandClass, OperandKind};

/// Named segments with fixed default origins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    /// Code segment, origin 0x0000.
    Text,
    /// Data segment, origin 0x4000.
    Static,
}

impl SegmentKind {
    /// Default origin of this segment's location counter.
    #[must_use]
    pub const fn origin(self) -> u32 {
        match self {
            Self::Text => 0x0000,
            Self::Static => 0x4000,
        }
    }

    /// Directive spelling for messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Text => ".text",
            Self::Static => ".static",
        }
    }
}

/// Data directive element widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataWidth {
    /// `db`: one byte per element.
    Byte,
    /// `dw`: two bytes per element.
    Word,
    /// `dd`: four bytes per element.
    Dword,
    /// `df`: four-byte IEEE-754 binary32 per element.
    Float,
}

impl DataWidth {
    /// Encoded bytes per element.
    #[must_use]
    pub const fn size(self) -> u32 {
        match self {
            Self::Byte => 1,
            Self::Word => 2,
            Self::Dword | Self::Float => 4,
        }
    }
}

/// A single element of a data directive, resolved in pass 2.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    /// Integer literal (kept wide; masked to the directive width).
    Literal(i64),
    /// Float literal.
    Float(f32),
    /// Label reference resolving to its address.
    Label(String),
}

/// A parsed instruction operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedOperand {
    /// `%Rn`.
    Register(u32),
    /// Bare integer or character literal (already encoded to bits).
    Immediate(u32),
    /// Label reference resolving to a direct address.
    Label(String),
    /// `[%Rn]`.
    Indirect(u32),
}

impl ParsedOperand {
    /// The wire kind this operand will encode as.
    #[must_use]
    pub const fn kind(&self) -> OperandKind {
        match self {
            Self::Register(_) => OperandKind::Reg,
            Self::Immediate(_) => OperandKind::Imm,
            Self::Label(_) => OperandKind::Addr,
            Self::Indirect(_) => OperandKind::Ind,
        }
    }
}

/// A parsed instruction with its resolved descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedInstruction {
    /// Descriptor from the shared ISA table.
    pub descriptor: &'static InstructionDescriptor,
    /// Operands in source order; arity already validated.
    pub operands: Vec<ParsedOperand>,
}

/// Content of a line after the optional label.
#[derive(Debug, Clone, PartialEq)]
pub enum LineContent {
    /// Nothing (label-only or blank line).
    Empty,
    /// Segment switch.
    Segment(SegmentKind),
    /// `.org <addr>`: reposition the active segment's counter.
    Org(u32),
    /// `.poke <addr> <byte...>`: emit literal bytes at an absolute
    /// address without touching any location counter.
    Poke {
        /// Absolute target address.
        addr: u32,
        /// Bytes to emit.
        bytes: Vec<u8>,
    },
    /// Data directive with its elements.
    Data {
        /// Element width.
        width: DataWidth,
        /// Elements in source order.
        values: Vec<DataValue>,
    },
    /// Instruction.
    Instruction(ParsedInstruction),
}

/// One fully parsed source line.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    /// Label defined at this line's address, if any.
    pub label: Option<String>,
    /// The line's content.
    pub content: LineContent,
}

/// Parse error with the offending 1-indexed line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// 1-indexed source line.
    pub line: usize,
    /// Kind of parse error.
    pub kind: ParseErrorKind,
}

/// Classification of parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Mnemonic not present in the ISA table.
    UnknownMnemonic(String),
    /// `.` directive not part of the grammar.
    UnknownDirective(String),
    /// Register outside `%R0..%R15` or malformed.
    InvalidRegister(String),
    /// Literal that parses as neither integer, float, nor character.
    InvalidLiteral(String),
    /// Label name with illegal characters.
    InvalidLabel(String),
    /// Operand count differs from the descriptor arity.
    OperandCount {
        /// The instruction mnemonic.
        mnemonic: String,
        /// Arity the descriptor requires.
        expected: usize,
        /// Operands supplied.
        found: usize,
    },
    /// Operand kind not accepted by the descriptor slot.
    OperandType {
        /// The instruction mnemonic.
        mnemonic: String,
        /// 1-indexed operand position.
        position: usize,
        /// The class the slot accepts.
        expected: OperandClass,
    },
    /// Directive argument missing or malformed.
    MalformedDirective(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ParseErrorKind::UnknownMnemonic(name) => write!(f, "unknown mnemonic: {name}"),
            ParseErrorKind::UnknownDirective(name) => write!(f, "unknown directive: {name}"),
            ParseErrorKind::InvalidRegister(text) => write!(f, "invalid register: {text}"),
            ParseErrorKind::InvalidLiteral(text) => write!(f, "invalid literal: {text}"),
            ParseErrorKind::InvalidLabel(text) => write!(f, "invalid label: {text}"),
            ParseErrorKind::OperandCount {
                mnemonic,
                expected,
                found,
            } => write!(
                f,
                "{mnemonic} takes {expected} operand(s), found {found}"
            ),
            ParseErrorKind::OperandType {
                mnemonic,
                position,
                expected,
            } => write!(
                f,
                "operand {position} of {mnemonic} must be {expected:?}"
            ),
            ParseErrorKind::MalformedDirective(text) => {
                write!(f, "malformed directive: {text}")
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Parses one comment-stripped source line.
///
/// # Errors
///
/// Returns [`ParseError`] for unknown mnemonics/directives, malformed
/// operands, and operand count/kind mismatches.
pub fn parse_line(text: &str, line_number: usize) -> Result<Line, ParseError> {
    let stripped = text.split(';').next().unwrap_or_default().trim();
    if stripped.is_empty() {
        return Ok(Line {
            label: None,
            content: LineContent::Empty,
        });
    }

    let (label, rest) = match split_label(stripped) {
        Some((label, rest)) => {
            if !is_valid_label(&label) {
                return Err(ParseError {
                    line: line_number,
                    kind: ParseErrorKind::InvalidLabel(label),
                });
            }
            (Some(label), rest.trim().to_string())
        }
        None => (None, stripped.to_string()),
    };

    if rest.is_empty() {
        return Ok(Line {
            label,
            content: LineContent::Empty,
        });
    }

    let content = if rest.starts_with('.') {
        parse_directive(&rest, line_number)?
    } else {
        let mut tokens = tokenize(&rest);
        if tokens.is_empty() {
            return Err(ParseError {
                line: line_number,
                kind: ParseErrorKind::UnknownMnemonic(rest),
            });
        }
        let mnemonic = tokens.remove(0);
        if matches!(mnemonic.to_ascii_lowercase().as_str(), "db" | "dw" | "dd" | "df") {
            parse_data(&mnemonic, &tokens, line_number)?
        } else {
            parse_instruction(&mnemonic, &tokens, line_number)?
        }
    };

    Ok(Line { label, content })
}

fn split_label(text: &str) -> Option<(String, &str)> {
    // A colon inside a character literal is not a label separator.
    let colon = text
        .char_indices()
        .take_while(|(_, c)| *c != '\'' && *c != '"')
        .find(|(_, c)| *c == ':')
        .map(|(i, _)| i)?;
    let label = text[..colon].trim().to_string();
    Some((label, &text[colon + 1..]))
}

fn is_valid_label(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_alphabetic() && first != '_' {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Splits an operand list on commas/whitespace, honoring brackets and
/// quotes.
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_bracket = false;
    let mut in_quote = false;

    for ch in text.chars() {
        match ch {
            '\'' => {
                in_quote = !in_quote;
                current.push(ch);
            }
            '[' if !in_quote => {
                in_bracket = true;
                current.push(ch);
            }
            ']' if !in_quote => {
                in_bracket = false;
                current.push(ch);
            }
            ',' | ' ' | '\t' if !in_bracket && !in_quote => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(ch),
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

fn parse_directive(text: &str, line_number: usize) -> Result<LineContent, ParseError> {
    let mut parts = text.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();

    match name.to_ascii_lowercase().as_str() {
        ".text" => Ok(LineContent::Segment(SegmentKind::Text)),
        ".static" => Ok(LineContent::Segment(SegmentKind::Static)),
        ".org" => {
            let [arg] = args.as_slice() else {
                return Err(ParseError {
                    line: line_number,
                    kind: ParseErrorKind::MalformedDirective(text.to_string()),
                });
            };
            let addr = parse_unsigned(arg).ok_or_else(|| ParseError {
                line: line_number,
                kind: ParseErrorKind::InvalidLiteral((*arg).to_string()),
            })?;
            Ok(LineContent::Org(addr))
        }
        ".poke" => {
            let Some((addr_text, byte_texts)) = args.split_first() else {
                return Err(ParseError {
                    line: line_number,
                    kind: ParseErrorKind::MalformedDirective(text.to_string()),
                });
            };
            if byte_texts.is_empty() {
                return Err(ParseError {
                    line: line_number,
                    kind: ParseErrorKind::MalformedDirective(text.to_string()),
                });
            }
            let addr = parse_unsigned(addr_text).ok_or_else(|| ParseError {
                line: line_number,
                kind: ParseErrorKind::InvalidLiteral((*addr_text).to_string()),
            })?;
            let mut bytes = Vec::with_capacity(byte_texts.len());
            for byte_text in byte_texts {
                let value = parse_unsigned(byte_text)
                    .and_then(|v| u8::try_from(v).ok())
                    .ok_or_else(|| ParseError {
                        line: line_number,
                        kind: ParseErrorKind::InvalidLiteral((*byte_text).to_string()),
                    })?;
                bytes.push(value);
            }
            Ok(LineContent::Poke { addr, bytes })
        }
        other => Err(ParseError {
            line: line_number,
            kind: ParseErrorKind::UnknownDirective(other.to_string()),
        }),
    }
}

fn parse_data(
    mnemonic: &str,
    tokens: &[String],
    line_number: usize,
) -> Result<LineContent, ParseError> {
    let width = match mnemonic.to_ascii_lowercase().as_str() {
        "db" => DataWidth::Byte,
        "dw" => DataWidth::Word,
        "dd" => DataWidth::Dword,
        _ => DataWidth::Float,
    };

    if tokens.is_empty() {
        return Err(ParseError {
            line: line_number,
            kind: ParseErrorKind::MalformedDirective(mnemonic.to_string()),
        });
    }

    let mut values = Vec::with_capacity(tokens.len());
    for token in tokens {
        values.push(parse_data_value(token, width, line_number)?);
    }

    Ok(LineContent::Data { width, values })
}

fn parse_data_value(
    token: &str,
    width: DataWidth,
    line_number: usize,
) -> Result<DataValue, ParseError> {
    let err = || ParseError {
        line: line_number,
        kind: ParseErrorKind::InvalidLiteral(token.to_string()),
    };

    if let Some(ch) = parse_char_literal(token) {
        return Ok(DataValue::Literal(i64::from(ch)));
    }

    if width == DataWidth::Float {
        return token.parse::<f32>().map(DataValue::Float).map_err(|_| err());
    }

    if token.contains('.') {
        return Err(err());
    }

    if let Some(value) = parse_signed(token) {
        return Ok(DataValue::Literal(value));
    }

    if is_valid_label(token) {
        return Ok(DataValue::Label(token.to_string()));
    }

    Err(err())
}

fn parse_instruction(
    mnemonic: &str,
    tokens: &[String],
    line_number: usize,
) -> Result<LineContent, ParseError> {
    let descriptor = lookup_mnemonic(mnemonic).ok_or_else(|| ParseError {
        line: line_number,
        kind: ParseErrorKind::UnknownMnemonic(mnemonic.to_string()),
    })?;

    if tokens.len() != descriptor.arity() {
        return Err(ParseError {
            line: line_number,
            kind: ParseErrorKind::OperandCount {
                mnemonic: descriptor.mnemonic.to_string(),
                expected: descriptor.arity(),
                found: tokens.len(),
            },
        });
    }

    let mut operands = Vec::with_capacity(tokens.len());
    for (index, (token, class)) in tokens.iter().zip(descriptor.operands).enumerate() {
        let operand = parse_operand(token, line_number)?;
        if !class.allows(operand.kind()) {
            return Err(ParseError {
                line: line_number,
                kind: ParseErrorKind::OperandType {
                    mnemonic: descriptor.mnemonic.to_string(),
                    position: index + 1,
                    expected: *class,
                },
            });
        }
        operands.push(operand);
    }

    Ok(LineContent::Instruction(ParsedInstruction {
        descriptor,
        operands,
    }))
}

fn parse_operand(token: &str, line_number: usize) -> Result<ParsedOperand, ParseError> {
    if let Some(inner) = token.strip_prefix('[') {
        let inner = inner.strip_suffix(']').ok_or_else(|| ParseError {
            line: line_number,
            kind: ParseErrorKind::InvalidLiteral(token.to_string()),
        })?;
        let index = parse_register(inner.trim()).ok_or_else(|| ParseError {
            line: line_number,
            kind: ParseErrorKind::InvalidRegister(inner.trim().to_string()),
        })?;
        return Ok(ParsedOperand::Indirect(index));
    }

    if token.starts_with('%') {
        let index = parse_register(token).ok_or_else(|| ParseError {
            line: line_number,
            kind: ParseErrorKind::InvalidRegister(token.to_string()),
        })?;
        return Ok(ParsedOperand::Register(index));
    }

    if let Some(ch) = parse_char_literal(token) {
        return Ok(ParsedOperand::Immediate(u32::from(ch)));
    }

    if token.contains('.') && token.parse::<f32>().is_ok() {
        // Float immediates travel as their bit pattern.
        let value = token.parse::<f32>().map_err(|_| ParseError {
            line: line_number,
            kind: ParseErrorKind::InvalidLiteral(token.to_string()),
        })?;
        return Ok(ParsedOperand::Immediate(value.to_bits()));
    }

    if let Some(value) = parse_signed(token) {
        let bits = encode_signed(value).ok_or_else(|| ParseError {
            line: line_number,
            kind: ParseErrorKind::InvalidLiteral(token.to_string()),
        })?;
        return Ok(ParsedOperand::Immediate(bits));
    }

    if is_valid_label(token) {
        return Ok(ParsedOperand::Label(token.to_string()));
    }

    Err(ParseError {
        line: line_number,
        kind: ParseErrorKind::InvalidLiteral(token.to_string()),
    })
}

fn parse_register(token: &str) -> Option<u32> {
    let rest = token.strip_prefix('%')?;
    let digits = rest.strip_prefix(['R', 'r'])?;
    let index: u32 = digits.parse().ok()?;
    (index < 16).then_some(index)
}

fn parse_char_literal(token: &str) -> Option<u8> {
    let inner = token.strip_prefix('\'')?.strip_suffix('\'')?;
    let mut chars = inner.chars();
    let value = match (chars.next()?, chars.next()) {
        ('\\', Some(escape)) => match escape {
            'n' => b'\n',
            't' => b'\t',
            '0' => 0,
            '\\' => b'\\',
            '\'' => b'\'',
            _ => return None,
        },
        (ch, None) if ch.is_ascii() => {
            let mut buffer = [0u8; 1];
            ch.encode_utf8(&mut buffer);
            buffer[0]
        }
        _ => return None,
    };
    chars.next().is_none().then_some(value)
}

/// Parses a non-negative integer literal (decimal or `0x` hex).
fn parse_unsigned(token: &str) -> Option<u32> {
    token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .map_or_else(
            || token.parse().ok(),
            |hex| u32::from_str_radix(hex, 16).ok(),
        )
}

/// Parses an integer literal allowing a leading minus sign.
fn parse_signed(token: &str) -> Option<i64> {
    if let Some(rest) = token.strip_prefix('-') {
        parse_unsigned(rest).map(|v| -i64::from(v))
    } else {
        parse_unsigned(token).map(i64::from)
    }
}

/// Narrows a signed literal to 32 bits (two's complement for negatives).
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn encode_signed(value: i64) -> Option<u32> {
    if (i64::from(i32::MIN)..=i64::from(u32::MAX)).contains(&value) {
        Some(value as u32)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::{
        parse_line, DataValue, DataWidth, Line, LineContent, ParseErrorKind, ParsedOperand,
        SegmentKind,
    };
    use ferrite_core::OperandClass;

    fn content(text: &str) -> LineContent {
        parse_line(text, 1).unwrap().content
    }

    fn instruction_operands(text: &str) -> Vec<ParsedOperand> {
        match content(text) {
            LineContent::Instruction(instr) => instr.operands,
            other => panic!("expected instruction, got {other:?}"),
        }
    }

    #[test]
    fn blank_and_comment_lines_are_empty() {
        assert_eq!(
            parse_line("", 1).unwrap(),
            Line {
                label: None,
                content: LineContent::Empty
            }
        );
        assert_eq!(content("   ; just a comment"), LineContent::Empty);
    }

    #[test]
    fn label_alone_and_with_instruction() {
        let line = parse_line("start:", 1).unwrap();
        assert_eq!(line.label.as_deref(), Some("start"));
        assert_eq!(line.content, LineContent::Empty);

        let line = parse_line("init: MOV %R0, 1", 1).unwrap();
        assert_eq!(line.label.as_deref(), Some("init"));
        assert!(matches!(line.content, LineContent::Instruction(_)));
    }

    #[test]
    fn invalid_label_is_rejected() {
        let err = parse_line("9lives: HALT", 1).unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::InvalidLabel(_)));
    }

    #[test]
    fn segment_directives() {
        assert_eq!(content(".text"), LineContent::Segment(SegmentKind::Text));
        assert_eq!(
            content(".static"),
            LineContent::Segment(SegmentKind::Static)
        );
    }

    #[test]
    fn org_accepts_hex_and_decimal() {
        assert_eq!(content(".org 0x100"), LineContent::Org(0x100));
        assert_eq!(content(".org 256"), LineContent::Org(256));
    }

    #[test]
    fn org_requires_one_argument() {
        assert!(matches!(
            parse_line(".org", 1).unwrap_err().kind,
            ParseErrorKind::MalformedDirective(_)
        ));
        assert!(matches!(
            parse_line(".org 1 2", 1).unwrap_err().kind,
            ParseErrorKind::MalformedDirective(_)
        ));
    }

    #[test]
    fn poke_collects_bytes_at_address() {
        assert_eq!(
            content(".poke 0x800 72 0x69"),
            LineContent::Poke {
                addr: 0x800,
                bytes: vec![72, 0x69]
            }
        );
    }

    #[test]
    fn poke_rejects_wide_bytes() {
        assert!(matches!(
            parse_line(".poke 0x800 256", 1).unwrap_err().kind,
            ParseErrorKind::InvalidLiteral(_)
        ));
    }

    #[test]
    fn unknown_directive_is_rejected() {
        let err = parse_line(".bogus 1", 1).unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::UnknownDirective(".bogus".to_string())
        );
    }

    #[test]
    fn data_directive_widths() {
        assert_eq!(
            content("db 1 2 3"),
            LineContent::Data {
                width: DataWidth::Byte,
                values: vec![
                    DataValue::Literal(1),
                    DataValue::Literal(2),
                    DataValue::Literal(3)
                ]
            }
        );
        assert!(matches!(
            content("dw 0x1234"),
            LineContent::Data {
                width: DataWidth::Word,
                ..
            }
        ));
        assert!(matches!(
            content("dd 0xDEADBEEF"),
            LineContent::Data {
                width: DataWidth::Dword,
                ..
            }
        ));
    }

    #[test]
    fn data_accepts_commas_chars_and_labels() {
        assert_eq!(
            content("db 'H', 'i', 0"),
            LineContent::Data {
                width: DataWidth::Byte,
                values: vec![
                    DataValue::Literal(72),
                    DataValue::Literal(105),
                    DataValue::Literal(0)
                ]
            }
        );
        assert_eq!(
            content("dd buffer"),
            LineContent::Data {
                width: DataWidth::Dword,
                values: vec![DataValue::Label("buffer".to_string())]
            }
        );
    }

    #[test]
    fn float_data_parses_floats_and_ints() {
        assert_eq!(
            content("df 1.5 2"),
            LineContent::Data {
                width: DataWidth::Float,
                values: vec![DataValue::Float(1.5), DataValue::Float(2.0)]
            }
        );
    }

    #[test]
    fn float_literal_in_integer_data_is_rejected() {
        assert!(matches!(
            parse_line("db 1.5", 1).unwrap_err().kind,
            ParseErrorKind::InvalidLiteral(_)
        ));
    }

    #[test]
    fn empty_data_directive_is_rejected() {
        assert!(matches!(
            parse_line("db", 1).unwrap_err().kind,
            ParseErrorKind::MalformedDirective(_)
        ));
    }

    #[test]
    fn mov_register_and_immediate_forms() {
        assert_eq!(
            instruction_operands("MOV %R0, 5"),
            vec![ParsedOperand::Register(0), ParsedOperand::Immediate(5)]
        );
        assert_eq!(
            instruction_operands("MOV %R3, %R12"),
            vec![ParsedOperand::Register(3), ParsedOperand::Register(12)]
        );
    }

    #[test]
    fn mnemonics_and_registers_are_case_insensitive() {
        assert_eq!(
            instruction_operands("mov %r1, 0x10"),
            vec![ParsedOperand::Register(1), ParsedOperand::Immediate(0x10)]
        );
    }

    #[test]
    fn load_supports_label_indirect_and_literal_addresses() {
        assert_eq!(
            instruction_operands("LOAD %R0, table"),
            vec![
                ParsedOperand::Register(0),
                ParsedOperand::Label("table".to_string())
            ]
        );
        assert_eq!(
            instruction_operands("LOAD %R0, [%R2]"),
            vec![ParsedOperand::Register(0), ParsedOperand::Indirect(2)]
        );
        assert_eq!(
            instruction_operands("LOAD %R0, 0x4000"),
            vec![ParsedOperand::Register(0), ParsedOperand::Immediate(0x4000)]
        );
    }

    #[test]
    fn char_immediates_and_escapes() {
        assert_eq!(
            instruction_operands("MOV %R0, 'A'"),
            vec![ParsedOperand::Register(0), ParsedOperand::Immediate(65)]
        );
        assert_eq!(
            instruction_operands("MOV %R0, '\\n'"),
            vec![ParsedOperand::Register(0), ParsedOperand::Immediate(10)]
        );
    }

    #[test]
    fn negative_immediates_use_twos_complement() {
        assert_eq!(
            instruction_operands("MOV %R0, -1"),
            vec![ParsedOperand::Register(0), ParsedOperand::Immediate(u32::MAX)]
        );
    }

    #[test]
    fn float_immediates_carry_their_bit_pattern() {
        assert_eq!(
            instruction_operands("FMOV %R0, 1.5"),
            vec![
                ParsedOperand::Register(0),
                ParsedOperand::Immediate(1.5f32.to_bits())
            ]
        );
    }

    #[test]
    fn unknown_mnemonic_is_rejected() {
        let err = parse_line("FROB %R0", 1).unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::UnknownMnemonic("FROB".to_string())
        );
    }

    #[test]
    fn register_out_of_range_is_rejected() {
        let err = parse_line("MOV %R16, 1", 1).unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::InvalidRegister(_)));
    }

    #[test]
    fn operand_count_mismatch_is_rejected() {
        let err = parse_line("HALT %R0", 1).unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::OperandCount {
                mnemonic: "HALT".to_string(),
                expected: 0,
                found: 1
            }
        );

        let err = parse_line("MOV %R0", 1).unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::OperandCount { .. }));
    }

    #[test]
    fn operand_type_mismatch_is_rejected() {
        // MOV destination must be a register, not an address.
        let err = parse_line("MOV somewhere, %R0", 1).unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::OperandType {
                mnemonic: "MOV".to_string(),
                position: 1,
                expected: OperandClass::Reg
            }
        );

        // JUMP cannot target a bare register.
        let err = parse_line("JUMP %R1", 1).unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::OperandType { .. }));
    }

    #[test]
    fn jump_accepts_labels_and_literal_targets() {
        assert_eq!(
            instruction_operands("JUMP main"),
            vec![ParsedOperand::Label("main".to_string())]
        );
        assert_eq!(
            instruction_operands("JZ 0x40"),
            vec![ParsedOperand::Immediate(0x40)]
        );
    }

    #[test]
    fn pim_ops_take_two_memory_operands() {
        assert_eq!(
            instruction_operands("PIM_ADD acc, step"),
            vec![
                ParsedOperand::Label("acc".to_string()),
                ParsedOperand::Label("step".to_string())
            ]
        );
        assert_eq!(
            instruction_operands("PIM_FMUL [%R1], 0x4000"),
            vec![ParsedOperand::Indirect(1), ParsedOperand::Immediate(0x4000)]
        );
    }

    #[test]
    fn int_takes_an_immediate_only() {
        assert_eq!(
            instruction_operands("INT 2"),
            vec![ParsedOperand::Immediate(2)]
        );
        let err = parse_line("INT %R0", 1).unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::OperandType { .. }));
    }

    #[test]
    fn trailing_comment_after_operands_is_ignored() {
        assert_eq!(
            instruction_operands("SUB %R1, %R2 ; subtract"),
            vec![ParsedOperand::Register(1), ParsedOperand::Register(2)]
        );
    }
}
