//! Header-mode emission (§4.2 "Header mode"): struct layouts and
//! prototypes only, no function bodies.

use crate::types::{Command, Ir};
use crate::writer::{FunctionSignature, Writer};
use std::io::Write;

/// Each field as a complete `"<decl>;"` line: `const struct strlist* %s;`
/// for accumulators, `const char* %s;` for arg-bearing options, and
/// `unsigned %s : 1;` for flags.
fn opt_field(og: &crate::types::OptGroup) -> Vec<String> {
    let mut fields = Vec::new();
    for acc in &og.accumulations {
        fields.push(format!("const struct strlist* {acc};"));
    }
    for o in &og.options {
        if o.accumulate.is_some() {
            continue;
        }
        if o.arg.is_some() {
            fields.push(format!("const char* {};", o.symbol));
        }
    }
    for o in &og.options {
        if o.accumulate.is_none() && o.arg.is_none() {
            fields.push(format!("unsigned {} : 1;", o.symbol));
        }
    }
    fields
}

fn cmd_info_fields(cmd: &Command) -> Vec<String> {
    let mut fields: Vec<String> =
        cmd.optgroups.iter().map(|og| format!("struct {} {};", og.struct_name(), og.symbol)).collect();
    for arg in &cmd.arguments {
        if arg.repeat {
            fields.push(format!("const char** {};", arg.symbol));
        } else {
            fields.push(format!("const char* {};", arg.symbol));
        }
    }
    fields
}

pub fn emit<W: Write>(w: &mut Writer<W>, ir: &Ir) -> anyhow::Result<()> {
    w.writeln("#pragma once")?;
    w.blank()?;
    w.include("util.h")?;
    w.include("cmd.h")?;
    w.include("argv.h")?;
    w.blank()?;

    for og in &ir.optgroups {
        let fields = opt_field(og);
        w.struct_definition(&og.struct_name(), |w| {
            for field in &fields {
                w.writeln(field)?;
            }
            Ok(())
        })?;
        w.blank()?;
        if og.export_emit_args {
            let sig = FunctionSignature::new(
                "void",
                format!("emit_args_{}_opts", og.name),
                vec![("struct strlist *".to_string(), "dest".to_string()), (format!("const struct {} *", og.struct_name()), "info".to_string())],
            );
            w.prototype(&sig, false)?;
            w.blank()?;
        }
    }

    for cmd in &ir.commands {
        let fields = cmd_info_fields(cmd);
        w.struct_definition(&cmd.struct_name(), |w| {
            for field in &fields {
                w.writeln(field)?;
            }
            Ok(())
        })?;
        w.blank()?;

        let make_args_sig = FunctionSignature::new(
            "struct strlist *",
            cmd.make_args_fn_name(),
            vec![
                ("const struct ".to_string() + &cmd.struct_name(), "*info".to_string()),
                ("unsigned".to_string(), "which".to_string()),
            ],
        );
        w.prototype(&make_args_sig, false)?;

        let main_sig = FunctionSignature::new(
            "int",
            cmd.main_fn_name(),
            vec![("const struct ".to_string() + &cmd.struct_name(), "*info".to_string())],
        );
        w.prototype(&main_sig, false)?;

        if cmd.export_parse_args {
            let parse_sig = FunctionSignature::new(
                "void",
                cmd.parse_args_fn_name(),
                vec![
                    ("struct ".to_string() + &cmd.struct_name(), "*ret".to_string()),
                    ("int".to_string(), "argc".to_string()),
                    ("char **".to_string(), "argv".to_string()),
                ],
            );
            w.prototype(&parse_sig, false)?;
        }
        w.blank()?;
    }

    // `struct cmd` is part of the fixed external surface declared by
    // `cmd.h` (§6) — the generator targets it, it does not invent its own
    // registry-entry type.
    w.writeln("extern const struct cmd autocmds[];")?;
    Ok(())
}
