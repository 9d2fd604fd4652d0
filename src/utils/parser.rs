// Copyright (c) 2024 Mudit Bhargava
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.
//

// parser.rs
//
// Converts program text into the ordered `Instruction` array the engine
// consumes (§6). One instruction per line; `#` starts a comment (either
// a whole-line comment or a trailing one); blank lines are skipped.
// Every recognised opcode is `OP DEST SRC1 SRC2`, except that LOAD and
// STORE also accept an `OFFSET(BASE)` operand in place of two of those
// slots.

use crate::core::instruction::{Instruction, OpKind, Operand};
use crate::errors::SimulatorError;

/// Parses a complete program. Reports the first malformed line; no
/// partial program is returned on error (§7.1).
pub fn parse_program(source: &str) -> Result<Vec<Instruction>, SimulatorError> {
    let mut instructions = Vec::new();
    for (offset, raw_line) in source.lines().enumerate() {
        let line_no = offset + 1;
        let stripped = strip_comment(raw_line).trim();
        if stripped.is_empty() {
            continue;
        }
        let id = instructions.len();
        instructions.push(parse_line(stripped, line_no, id)?);
    }
    Ok(instructions)
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn parse_line(line: &str, line_no: usize, id: usize) -> Result<Instruction, SimulatorError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let err = |reason: &str| {
        Err(SimulatorError::ParseError { line: line_no, text: line.to_string(), reason: reason.to_string() })
    };

    let op = match parse_opcode(tokens[0]) {
        Some(op) => op,
        None => return err(&format!("unrecognised opcode '{}'", tokens[0])),
    };
    let rest = &tokens[1..];

    match op {
        OpKind::Add | OpKind::Sub | OpKind::Mul | OpKind::Div => {
            if rest.len() != 3 {
                return err(&format!("{} expects DEST SRC1 SRC2", op));
            }
            let dest = parse_register(rest[0], line_no, line)?;
            let src1 = parse_operand(rest[1], line_no, line)?;
            let src2 = parse_operand(rest[2], line_no, line)?;
            Ok(Instruction::new(id, op, Some(dest), src1, src2, 0, None))
        }
        OpKind::Load => {
            if rest.len() == 2 {
                let dest = parse_register(rest[0], line_no, line)?;
                let (offset, base) = parse_offset_base(rest[1], line_no, line)?;
                Ok(Instruction::new(id, op, Some(dest), Operand::Reg(base), Operand::None, offset, None))
            } else if rest.len() == 3 {
                let dest = parse_register(rest[0], line_no, line)?;
                let base = parse_register(rest[1], line_no, line)?;
                let offset = parse_immediate(rest[2], line_no, line)?;
                Ok(Instruction::new(id, op, Some(dest), Operand::Reg(base), Operand::None, offset, None))
            } else {
                err(&format!("{} expects DEST OFFSET(BASE) or DEST BASE OFFSET", op))
            }
        }
        OpKind::Store => {
            if rest.len() == 2 {
                let value = parse_register(rest[0], line_no, line)?;
                let (offset, base) = parse_offset_base(rest[1], line_no, line)?;
                Ok(Instruction::new(id, op, None, Operand::Reg(base), Operand::Reg(value), offset, None))
            } else if rest.len() == 3 {
                let base = parse_register(rest[0], line_no, line)?;
                let value = parse_register(rest[1], line_no, line)?;
                let offset = parse_immediate(rest[2], line_no, line)?;
                Ok(Instruction::new(id, op, None, Operand::Reg(base), Operand::Reg(value), offset, None))
            } else {
                err(&format!("{} expects VALUE OFFSET(BASE) or BASE VALUE OFFSET", op))
            }
        }
        OpKind::Beq | OpKind::Bne => {
            if rest.len() != 3 {
                return err(&format!("{} expects TARGET SRC1 SRC2", op));
            }
            let target = parse_immediate(rest[0], line_no, line)?;
            if target < 0 {
                return err("branch target id must not be negative");
            }
            let src1 = parse_operand(rest[1], line_no, line)?;
            let src2 = parse_operand(rest[2], line_no, line)?;
            Ok(Instruction::new(id, op, None, src1, src2, 0, Some(target as usize)))
        }
    }
}

fn parse_opcode(token: &str) -> Option<OpKind> {
    match token.to_ascii_uppercase().as_str() {
        "ADD" => Some(OpKind::Add),
        "SUB" => Some(OpKind::Sub),
        "MUL" => Some(OpKind::Mul),
        "DIV" => Some(OpKind::Div),
        "LD" | "LOAD" | "LW" => Some(OpKind::Load),
        "ST" | "STORE" | "SW" => Some(OpKind::Store),
        "BEQ" => Some(OpKind::Beq),
        "BNE" => Some(OpKind::Bne),
        _ => None,
    }
}

fn is_register_name(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some('R') | Some('F') => {}
        _ => return false,
    }
    let rest: &str = chars.as_str();
    !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit())
}

fn parse_register(token: &str, line_no: usize, text: &str) -> Result<String, SimulatorError> {
    if is_register_name(token) {
        Ok(token.to_string())
    } else {
        Err(SimulatorError::ParseError {
            line: line_no,
            text: text.to_string(),
            reason: format!("expected a register name (R<n> or F<n>), got '{}'", token),
        })
    }
}

fn parse_immediate(token: &str, line_no: usize, text: &str) -> Result<i64, SimulatorError> {
    token.parse::<i64>().map_err(|_| SimulatorError::ParseError {
        line: line_no,
        text: text.to_string(),
        reason: format!("expected an integer literal, got '{}'", token),
    })
}

/// A source operand that may be a register or an immediate (§6). Used
/// for the arithmetic ops and the branch comparison slots.
fn parse_operand(token: &str, line_no: usize, text: &str) -> Result<Operand, SimulatorError> {
    if is_register_name(token) {
        Ok(Operand::Reg(token.to_string()))
    } else {
        parse_immediate(token, line_no, text).map(Operand::Imm)
    }
}

/// Parses the `OFFSET(BASE)` form LOAD/STORE accept in place of two
/// operand slots. Returns `(offset, base_register_name)`.
fn parse_offset_base(token: &str, line_no: usize, text: &str) -> Result<(i64, String), SimulatorError> {
    let open = token.find('(');
    let close = token.rfind(')');
    let malformed = || SimulatorError::ParseError {
        line: line_no,
        text: text.to_string(),
        reason: format!("expected OFFSET(BASE), got '{}'", token),
    };
    match (open, close) {
        (Some(o), Some(c)) if o < c && c == token.len() - 1 => {
            let offset = parse_immediate(&token[..o], line_no, text)?;
            let base = &token[o + 1..c];
            if is_register_name(base) {
                Ok((offset, base.to_string()))
            } else {
                Err(malformed())
            }
        }
        _ => Err(malformed()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_arithmetic() {
        let program = parse_program("ADD R1 R2 R3\nSUB R4 R1 5").unwrap();
        assert_eq!(program.len(), 2);
        assert_eq!(program[0].op, OpKind::Add);
        assert_eq!(program[0].dest.as_deref(), Some("R1"));
        assert_eq!(program[1].src2, Operand::Imm(5));
    }

    #[test]
    fn ignores_blank_lines_and_comments() {
        let program = parse_program("# a comment\n\nADD R1 R2 R3  # trailing comment\n").unwrap();
        assert_eq!(program.len(), 1);
        assert_eq!(program[0].id, 0);
    }

    #[test]
    fn parses_offset_base_load_and_store() {
        let program = parse_program("LD R1 0(R2)\nST R3 4(R2)").unwrap();
        assert_eq!(program[0].op, OpKind::Load);
        assert_eq!(program[0].dest.as_deref(), Some("R1"));
        assert_eq!(program[0].src1, Operand::Reg("R2".to_string()));
        assert_eq!(program[0].offset, 0);

        assert_eq!(program[1].op, OpKind::Store);
        assert_eq!(program[1].dest, None);
        assert_eq!(program[1].src1, Operand::Reg("R2".to_string()));
        assert_eq!(program[1].src2, Operand::Reg("R3".to_string()));
        assert_eq!(program[1].offset, 4);
    }

    #[test]
    fn parses_plain_form_load_and_store_equivalently() {
        let a = parse_program("LD R1 0(R2)").unwrap();
        let b = parse_program("LD R1 R2 0").unwrap();
        assert_eq!(a[0].src1, b[0].src1);
        assert_eq!(a[0].offset, b[0].offset);
        assert_eq!(a[0].dest, b[0].dest);
    }

    #[test]
    fn recognises_opcode_aliases() {
        let program = parse_program("LOAD R1 0(R2)\nSW R3 4(R2)").unwrap();
        assert_eq!(program[0].op, OpKind::Load);
        assert_eq!(program[1].op, OpKind::Store);
    }

    #[test]
    fn parses_branch_with_integer_target() {
        let program = parse_program("BEQ 3 R0 R0").unwrap();
        assert_eq!(program[0].op, OpKind::Beq);
        assert_eq!(program[0].branch_target, Some(3));
        assert_eq!(program[0].dest, None);
    }

    #[test]
    fn reports_unknown_opcode_with_line_number() {
        let err = parse_program("ADD R1 R2 R3\nFOO R1 R2 R3").unwrap_err();
        match err {
            SimulatorError::ParseError { line, .. } => assert_eq!(line, 2),
            other => panic!("expected ParseError, got {:?}", other),
        }
    }

    #[test]
    fn reports_wrong_arity_with_line_number() {
        let err = parse_program("ADD R1 R2").unwrap_err();
        match err {
            SimulatorError::ParseError { line, .. } => assert_eq!(line, 1),
            other => panic!("expected ParseError, got {:?}", other),
        }
    }

    #[test]
    fn rejects_non_integer_branch_target() {
        let err = parse_program("BEQ abc R0 R0").unwrap_err();
        assert!(matches!(err, SimulatorError::ParseError { .. }));
    }
}
