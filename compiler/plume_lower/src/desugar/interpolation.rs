//! Interpolated strings.
//!
//! Without alignment or format specifiers the parts are concatenated:
//! `$"{a} and {b}"` becomes `"" + a + " and " + b`. The leading `""` makes
//! the first `+` a string concatenation when the string starts with a hole.
//!
//! Otherwise the string becomes a `string.Format` call with a composite
//! format string: `$"{x,5:F2}"` becomes `string.Format("{0,5:F2}", x)`.
//! Literal braces are doubled. Alignments must be compile-time constants.

use std::fmt::Write as _;

use plume_ir::ast::{BinaryOp, ExprKind, InterpolationPart};
use plume_ir::{ExprId, InterpPartRange};

use crate::rewrite::Rewriter;
use crate::LowerError;

pub(super) fn lower(rw: &mut Rewriter<'_>, id: ExprId, parts: InterpPartRange) -> Result<(), LowerError> {
    let parts = rw.input.interp_parts(parts).to_vec();
    let formatted = parts.iter().any(|part| match *part {
        InterpolationPart::Hole {
            alignment, format, ..
        } => alignment.is_valid() || !format.is_empty(),
        InterpolationPart::Text(_) => false,
    });
    let result = if formatted {
        format_call(rw, id, &parts)?
    } else {
        concatenation(rw, id, &parts)
    };
    rw.replace(id, result);
    Ok(())
}

fn concatenation(rw: &mut Rewriter<'_>, id: ExprId, parts: &[InterpolationPart]) -> ExprId {
    let span = rw.input.expr_span(id);
    let mut pieces: Vec<ExprId> = Vec::with_capacity(parts.len() + 1);
    if !matches!(parts.first(), Some(InterpolationPart::Text(_))) {
        pieces.push(rw.out.str_lit("", span));
    }
    for part in parts {
        match *part {
            InterpolationPart::Text(text) => {
                let text = rw.out.name_str(text);
                pieces.push(rw.out.str_lit(text, span));
            }
            InterpolationPart::Hole { expr, .. } => pieces.push(expr),
        }
    }
    let mut pieces = pieces.into_iter();
    let Some(first) = pieces.next() else {
        return rw.out.str_lit("", span);
    };
    pieces.fold(first, |acc, piece| rw.out.binary(BinaryOp::Add, acc, piece, span))
}

fn format_call(
    rw: &mut Rewriter<'_>,
    id: ExprId,
    parts: &[InterpolationPart],
) -> Result<ExprId, LowerError> {
    let span = rw.input.expr_span(id);
    let mut format = String::new();
    let mut args: Vec<ExprId> = Vec::new();
    for part in parts {
        match *part {
            InterpolationPart::Text(text) => {
                for c in rw.out.name_str(text).chars() {
                    match c {
                        '{' => format.push_str("{{"),
                        '}' => format.push_str("}}"),
                        other => format.push(other),
                    }
                }
            }
            InterpolationPart::Hole {
                expr,
                alignment,
                format: spec,
            } => {
                let _ = write!(format, "{{{}", args.len());
                if alignment.is_valid() {
                    let Some(width) = rw
                        .model
                        .constant_value(alignment)
                        .and_then(|value| value.as_int())
                    else {
                        return Err(LowerError::NonConstant {
                            pass: rw.pass,
                            what: "interpolation alignment".to_owned(),
                            span: rw.input.expr_span(alignment),
                        });
                    };
                    let _ = write!(format, ",{width}");
                }
                if !spec.is_empty() {
                    let _ = write!(format, ":{}", rw.out.name_str(spec));
                }
                format.push('}');
                args.push(expr);
            }
        }
    }
    let mut call_args = Vec::with_capacity(args.len() + 1);
    call_args.push(rw.out.str_lit(&format, span));
    call_args.extend(args);
    let string = rw.out.type_str("string");
    let receiver = rw.out.alloc_expr(ExprKind::TypeRef(string), span);
    Ok(rw.out.method_call(receiver, "Format", &call_args, span))
}
