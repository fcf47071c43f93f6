//! `sparseqc`'s flag parsing and dispatch (spec.md §6). Grounded directly
//! on `original_source/tools/taco.cpp`'s argv loop: each argument is split
//! on `=` first (more than one `=` is exit code 5 before any flag-specific
//! parsing runs), then each flag's value is split on `:` and validated
//! (malformed values are exit code 3). The positional, non-flag argument is
//! the expression source.

use crate::frontend::ReferenceParser;
use crate::interfaces::{CodegenCollaborator, ParserCollaborator, PrintingCodegen};
use crate::ir::indexvar::IndexVar;
use crate::ir::stmt::{IndexStmt, IndexStmtNode};
use crate::lower::lower;
use crate::notation::concretize;
use crate::types::{Format, ModeFormat, ModeFormatKind};
use std::collections::HashMap;
use std::fmt;

/// A CLI failure tagged with the exit code spec.md §6 assigns it.
#[derive(Debug, Clone)]
pub enum CliError {
    Usage(String),
    MalformedValue(String),
    VarNotFound(String),
    TooManyEquals(String),
    ParseError(String),
    VerifyMismatch(String),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_) => 2,
            CliError::MalformedValue(_) => 3,
            CliError::VarNotFound(_) => 4,
            CliError::TooManyEquals(_) => 5,
            CliError::ParseError(_) => 6,
            CliError::VerifyMismatch(_) => 7,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            CliError::Usage(m)
            | CliError::MalformedValue(m)
            | CliError::VarNotFound(m)
            | CliError::TooManyEquals(m)
            | CliError::ParseError(m)
            | CliError::VerifyMismatch(m) => m,
        };
        write!(f, "{msg}")
    }
}

impl std::error::Error for CliError {}

/// Flags collected from argv, before any tensor is parsed or loaded.
#[derive(Debug, Clone, Default)]
pub struct ParsedArgs {
    pub expr: Option<String>,
    pub formats: HashMap<String, Format>,
    pub dims: HashMap<String, usize>,
    pub tensor_files: HashMap<String, String>,
    pub tensor_fills: HashMap<String, String>,
    pub time_repeat: Option<u32>,
    pub print_compute: bool,
    pub print_assembly: bool,
    pub print_lattice: Option<String>,
    pub write_source: Option<String>,
    pub read_source: Vec<String>,
    pub verify: bool,
}

pub fn parse_args(args: &[String]) -> Result<ParsedArgs, CliError> {
    let mut out = ParsedArgs::default();
    for arg in args {
        let parts: Vec<&str> = arg.splitn(3, '=').collect();
        if parts.len() > 2 {
            return Err(CliError::TooManyEquals(format!("too many '=' signs in argument {arg:?}")));
        }
        let name = parts[0];
        let value = parts.get(1).copied().unwrap_or("");

        match name {
            "-f" => {
                let (tensor, format) = parse_format_descriptor(value)?;
                out.formats.insert(tensor, format);
            }
            "-d" => {
                let (var, size) = parse_dim_descriptor(value)?;
                out.dims.insert(var, size);
            }
            "-i" => {
                let (tensor, file) = split_one_colon(value, "read descriptor")?;
                out.tensor_files.insert(tensor, file);
            }
            "-g" => {
                let (tensor, fill) = split_one_colon(value, "generating descriptor")?;
                out.tensor_fills.insert(tensor, fill);
            }
            "-time" => {
                out.time_repeat = Some(if value.is_empty() {
                    1
                } else {
                    value
                        .parse()
                        .map_err(|_| CliError::MalformedValue(format!("incorrect time descriptor {value:?}")))?
                });
            }
            "-print-compute" => out.print_compute = true,
            "-print-assembly" => out.print_assembly = true,
            "-print-lattice" => out.print_lattice = Some(value.to_string()),
            "-write-source" => out.write_source = Some(value.to_string()),
            "-read-source" => out.read_source.push(value.to_string()),
            "-verify" => out.verify = true,
            _ => {
                if out.expr.is_some() {
                    return Err(CliError::Usage(format!("unexpected extra argument {arg:?}")));
                }
                out.expr = Some(arg.clone());
            }
        }
    }
    Ok(out)
}

fn parse_format_descriptor(value: &str) -> Result<(String, Format), CliError> {
    let parts: Vec<&str> = value.split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return Err(CliError::MalformedValue(format!("incorrect format descriptor {value:?}")));
    }
    let tensor = parts[0].to_string();
    let kinds: Vec<ModeFormatKind> = parts[1]
        .chars()
        .map(|c| match c {
            'd' => Ok(ModeFormatKind::Dense),
            's' => Ok(ModeFormatKind::Sparse),
            _ => Err(CliError::MalformedValue(format!("incorrect format descriptor {value:?}"))),
        })
        .collect::<Result<_, _>>()?;
    let orderings: Vec<usize> = match parts.get(2) {
        Some(order_str) => order_str
            .chars()
            .map(|c| {
                c.to_digit(10)
                    .map(|d| d as usize)
                    .ok_or_else(|| CliError::MalformedValue(format!("incorrect format descriptor {value:?}")))
            })
            .collect::<Result<_, _>>()?,
        None => (0..kinds.len()).collect(),
    };
    if orderings.len() != kinds.len() {
        return Err(CliError::MalformedValue(format!("incorrect format descriptor {value:?}")));
    }
    let modes = kinds
        .into_iter()
        .zip(orderings)
        .map(|(kind, ordering)| ModeFormat { kind, ordering })
        .collect();
    let format = Format::new(modes).map_err(|e| CliError::MalformedValue(e.reason))?;
    Ok((tensor, format))
}

fn parse_dim_descriptor(value: &str) -> Result<(String, usize), CliError> {
    let (var, size_str) = split_one_colon(value, "size descriptor")?;
    let size = size_str
        .parse::<usize>()
        .map_err(|_| CliError::MalformedValue(format!("incorrect size descriptor {value:?}")))?;
    Ok((var, size))
}

fn split_one_colon(value: &str, what: &str) -> Result<(String, String), CliError> {
    let parts: Vec<&str> = value.splitn(2, ':').collect();
    if parts.len() != 2 {
        return Err(CliError::MalformedValue(format!("incorrect {what} {value:?}")));
    }
    Ok((parts[0].to_string(), parts[1].to_string()))
}

fn find_forall<'a>(stmt: &'a IndexStmt, name: &str) -> Option<(IndexVar, &'a IndexStmt)> {
    match stmt.node() {
        IndexStmtNode::Forall(v, body, ..) => {
            if v.name() == name {
                Some((v.clone(), body))
            } else {
                find_forall(body, name)
            }
        }
        IndexStmtNode::Where(c, p) => find_forall(c, name).or_else(|| find_forall(p, name)),
        IndexStmtNode::Sequence(d, m) => find_forall(d, name).or_else(|| find_forall(m, name)),
        IndexStmtNode::Multi(a, b) => find_forall(a, name).or_else(|| find_forall(b, name)),
        IndexStmtNode::SuchThat(s, _) => find_forall(s, name),
        IndexStmtNode::Assignment(_) | IndexStmtNode::Yield(..) => None,
    }
}

fn index_var_dims(stmt: &IndexStmt, named_dims: &HashMap<String, usize>, default_dim: usize) -> HashMap<IndexVar, usize> {
    fn collect(stmt: &IndexStmt, out: &mut Vec<IndexVar>) {
        match stmt.node() {
            IndexStmtNode::Forall(v, body, ..) => {
                out.push(v.clone());
                collect(body, out);
            }
            IndexStmtNode::Where(c, p) => {
                collect(c, out);
                collect(p, out);
            }
            IndexStmtNode::Sequence(d, m) => {
                collect(d, out);
                collect(m, out);
            }
            IndexStmtNode::Multi(a, b) => {
                collect(a, out);
                collect(b, out);
            }
            IndexStmtNode::SuchThat(s, _) => collect(s, out),
            IndexStmtNode::Assignment(_) | IndexStmtNode::Yield(..) => {}
        }
    }
    let mut vars = Vec::new();
    collect(stmt, &mut vars);
    vars.into_iter()
        .map(|v| {
            let size = named_dims.get(v.name()).copied().unwrap_or(default_dim);
            (v, size)
        })
        .collect()
}

/// Run the CLI against already-tokenized arguments (no leading program
/// name), returning the text the flags asked to be printed.
pub fn run(args: &[String]) -> Result<String, CliError> {
    let parsed = parse_args(args)?;

    let Some(expr) = parsed.expr.clone() else {
        return Ok(String::new());
    };

    let mut parser = ReferenceParser::new();
    for (var, size) in &parsed.dims {
        parser = parser.with_dim(var.clone(), *size);
    }
    for (tensor, format) in &parsed.formats {
        parser = parser.with_format(tensor.clone(), format.clone());
    }

    let (einsum_stmt, _table) = parser.parse(&expr).map_err(|e| CliError::ParseError(e.reason))?;
    let concrete = concretize(&einsum_stmt).map_err(|e| CliError::ParseError(e.reason))?;

    if !parsed.tensor_files.is_empty() || !parsed.tensor_fills.is_empty() || parsed.verify {
        tracing::warn!(
            "tensor loading, filling, and verification require an external storage/codegen \
             collaborator; sparseqc's reference build only implements the print flags"
        );
    }

    let mut out = String::new();
    let nothing_else_requested = !parsed.print_assembly && parsed.print_lattice.is_none();

    if parsed.print_compute || nothing_else_requested {
        out.push_str(&concrete.to_string());
        out.push('\n');
    }

    if let Some(var_name) = &parsed.print_lattice {
        let (v, body) = find_forall(&concrete, var_name)
            .ok_or_else(|| CliError::VarNotFound(format!("index variable {var_name:?} is not in expression")))?;
        match crate::lower::expr_lattice_for(&v, body) {
            Some(lattice) => out.push_str(&format!("{lattice:?}\n")),
            None => out.push_str("<no lattice: variable does not gate an iterator>\n"),
        }
    }

    if parsed.print_assembly {
        let dims = index_var_dims(&concrete, &parsed.dims, parser.default_dim());
        let ir = lower(&concrete, &dims).map_err(|e| CliError::MalformedValue(e.reason))?;
        let codegen = PrintingCodegen::default();
        codegen.emit(&ir).map_err(|e| CliError::MalformedValue(e.reason))?;
        out.push_str(&codegen.rendered.borrow());
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_many_equals_signs_is_exit_code_five() {
        let err = parse_args(&["-f=A=ds".to_string()]).unwrap_err();
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn malformed_format_descriptor_is_exit_code_three() {
        let err = parse_args(&["-f=A:qq".to_string()]).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn non_numeric_dim_size_is_exit_code_three() {
        let err = parse_args(&["-d=i:abc".to_string()]).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn print_compute_renders_the_concrete_statement() {
        let out = run(&["A(i) = B(i)+C(i)".to_string(), "-print-compute".to_string()]).unwrap();
        assert!(out.contains("forall"));
    }

    #[test]
    fn print_lattice_on_unknown_variable_is_exit_code_four() {
        let err = run(&[
            "A(i) = B(i)+C(i)".to_string(),
            "-print-lattice=zzz".to_string(),
        ])
        .unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn print_assembly_renders_a_loop() {
        let out = run(&["A(i) = B(i)+C(i)".to_string(), "-print-assembly".to_string()]).unwrap();
        assert!(out.contains("for i in"));
    }
}
