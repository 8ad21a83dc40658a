//! Implementation-mode emission (§4.2 "Implementation mode"): option
//! re-serializers, argument parsers, per-command dispatchers, and the
//! `autocmds[]` registry, plus the formatted help blobs that back them.

use crate::formatter::pod_to_text;
use crate::quoting::quote_string;
use crate::types::{Command, Ir, Opt, OptGroup};
use crate::writer::{FunctionSignature, Writer};
use ecow::EcoString;
use foldhash::fast::RandomState;
use std::collections::HashSet;
use std::io::Write;

fn emit_args_fn<W: Write>(w: &mut Writer<W>, og: &OptGroup) -> anyhow::Result<()> {
    let sig = FunctionSignature::new(
        "void",
        format!("emit_args_{}_opts", og.name),
        vec![
            ("struct strlist *".to_string(), "dest".to_string()),
            (format!("const struct {} *", og.struct_name()), "info".to_string()),
        ],
    );
    w.function_definition(&sig, !og.export_emit_args, |w| {
        for acc in &og.accumulations {
            w.if_(&format!("info->{acc}"), |w| {
                w.writeln(&format!("accumulator_to_argv(dest, {}, info->{acc});", quote_string(acc)))
            })?;
        }
        for o in &og.options {
            if o.accumulate.is_some() {
                continue;
            }
            w.if_(&format!("info->{}", o.symbol), |w| {
                if let Some(short) = o.short {
                    w.writeln(&format!("strlist_append(dest, {});", quote_string(&format!("-{short}"))))?;
                } else {
                    w.writeln(&format!("strlist_append(dest, {});", quote_string(&format!("--{}", o.long))))?;
                }
                if o.arg.is_some() {
                    w.writeln(&format!("strlist_append(dest, info->{});", o.symbol))?;
                }
                Ok(())
            })?;
        }
        Ok(())
    })
}

fn emit_make_args_cmd<W: Write>(w: &mut Writer<W>, cmd: &Command) -> anyhow::Result<()> {
    let sig = FunctionSignature::new(
        "struct strlist *",
        cmd.make_args_fn_name(),
        vec![
            (format!("const struct {} *", cmd.struct_name()), "info".to_string()),
            ("unsigned".to_string(), "which".to_string()),
        ],
    );
    w.function_definition(&sig, false, |w| {
        w.writeln("struct strlist *dest = strlist_new();")?;
        for og in cmd.optgroups.iter().filter(|og| og.forward) {
            w.if_("which & CMD_ARG_FORWARDED", |w| {
                w.writeln(&format!("emit_args_{}_opts(dest, &info->{});", og.name, og.symbol))
            })?;
        }
        for og in cmd.optgroups.iter().filter(|og| !og.forward) {
            w.if_("which & CMD_ARG_NON_FORWARDED", |w| {
                w.writeln(&format!("emit_args_{}_opts(dest, &info->{});", og.name, og.symbol))
            })?;
        }
        w.if_("which & CMD_ARG_FORWARDED", |w| {
            w.writeln("strlist_append(dest, \"--\");")?;
            for arg in &cmd.arguments {
                if arg.repeat {
                    w.writeln(&format!("strlist_extend(dest, info->{});", arg.symbol))?;
                } else {
                    w.writeln(&format!("strlist_append(dest, info->{});", arg.symbol))?;
                }
            }
            Ok(())
        })?;
        w.writeln("return dest;")
    })
}

fn emit_record_option<W: Write>(w: &mut Writer<W>, og: &OptGroup, o: &Opt) -> anyhow::Result<()> {
    if let Some(acc) = &o.accumulate {
        w.writeln(&format!("accumulate(&ret->{}.{}, {}, optarg);", og.symbol, acc, quote_string(&o.long)))
    } else if o.arg.is_some() {
        w.writeln(&format!("ret->{}.{} = optarg;", og.symbol, o.symbol))
    } else {
        w.writeln(&format!("ret->{}.{} = 1;", og.symbol, o.symbol))
    }
}

fn emit_parse_args_cmd<W: Write>(w: &mut Writer<W>, cmd: &Command) -> anyhow::Result<()> {
    let is_static = !cmd.export_parse_args;
    let sig = FunctionSignature::new(
        "void",
        cmd.parse_args_fn_name(),
        vec![
            (format!("struct {} *", cmd.struct_name()), "ret".to_string()),
            ("int".to_string(), "argc".to_string()),
            ("char **".to_string(), "argv".to_string()),
        ],
    );
    w.function_definition(&sig, is_static, |w| {
        w.writeln("int c;")?;
        w.writeln("int long_idx;")?;
        w.writeln("optind = 1;")?;
        w.blank()?;
        w.writeln("static const struct option long_opts[] = {")?;
        w.indented(None, |w| {
            for (_, o) in cmd.iter_options() {
                let has_arg = if o.arg.is_some() { "required_argument" } else { "no_argument" };
                let val = o.short.map(|c| format!("'{c}'")).unwrap_or_else(|| "0".to_string());
                w.writeln(&format!("{{ {}, {has_arg}, NULL, {val} }},", quote_string(&o.long)))?;
            }
            w.writeln("{ NULL, 0, NULL, 0 },")
        })?;
        w.writeln("};")?;
        w.blank()?;
        let shorts: String = cmd
            .iter_options()
            .filter_map(|(_, o)| o.short.map(|c| if o.arg.is_some() { format!("{c}:") } else { c.to_string() }))
            .collect();
        w.writeln(&format!("static const char short_opts[] = {};", quote_string(&format!("+:{shorts}"))))?;
        w.blank()?;
        w.while_("(c = getopt_long(argc, argv, short_opts, long_opts, &long_idx)) != -1", |w| {
            w.switch("c", |s| {
                for (og, o) in cmd.iter_options() {
                    if let Some(sh) = o.short {
                        s.case(&format!("'{sh}'"), |w| emit_record_option(w, og, o))?;
                    }
                }
                s.case("0", |w| {
                    w.writeln("switch (long_idx) {")?;
                    w.indented(None, |w| {
                        for (idx, (og, o)) in cmd.iter_options().enumerate() {
                            if o.short.is_none() {
                                w.writeln(&format!("case {idx}:"))?;
                                w.indented(None, |w| {
                                    emit_record_option(w, og, o)?;
                                    w.writeln("break;")
                                })?;
                            }
                        }
                        Ok(())
                    })?;
                    w.writeln("}")
                })?;
                s.default(|w| {
                    let help = if cmd.has_doc.get() { format!("{}_usage", cmd.symbol) } else { "NULL".to_string() };
                    w.writeln(&format!("default_parse_args_error(c, optarg, {help});"))
                })
            })
        })?;
        w.blank()?;
        for arg in &cmd.arguments {
            if !arg.optional && !arg.repeat {
                w.if_("optind >= argc", |w| w.writeln("die(\"missing required argument\");"))?;
                w.writeln(&format!("ret->{} = argv[optind++];", arg.symbol))?;
            } else if arg.optional && !arg.repeat {
                w.if_("optind < argc", |w| w.writeln(&format!("ret->{} = argv[optind++];", arg.symbol)))?;
            } else {
                w.writeln(&format!("ret->{} = strlist_from_argv(argc - optind, argv + optind);", arg.symbol))?;
                w.writeln("optind = argc;")?;
            }
        }
        if !cmd.arguments.iter().any(|a| a.repeat) {
            w.if_("optind < argc", |w| w.writeln("die(\"too many arguments\");"))?;
        }
        Ok(())
    })
}

fn emit_dispatch<W: Write>(w: &mut Writer<W>, cmd: &Command) -> anyhow::Result<()> {
    let sig = FunctionSignature::new(
        "int",
        cmd.dispatch_fn_name(),
        vec![("int".to_string(), "argc".to_string()), ("char **".to_string(), "argv".to_string())],
    );
    w.function_definition(&sig, true, |w| {
        w.writeln(&format!("struct {} info;", cmd.struct_name()))?;
        w.writeln("memset(&info, 0, sizeof(info));")?;
        w.writeln(&format!("{}(&info, argc, argv);", cmd.parse_args_fn_name()))?;
        w.writeln(&format!("return {}(&info);", cmd.main_fn_name()))
    })
}

fn emit_autocmds<W: Write>(w: &mut Writer<W>, ir: &Ir) -> anyhow::Result<()> {
    w.writeln("const struct cmd autocmds[] = {")?;
    w.indented(None, |w| {
        for cmd in &ir.commands {
            for name in cmd.allnames() {
                w.writeln("{")?;
                w.indented(None, |w| {
                    w.writeln(&format!(".name = {},", quote_string(name)))?;
                    w.writeln(&format!(".main = {},", cmd.dispatch_fn_name()))
                })?;
                w.writeln("},")?;
            }
        }
        w.writeln("{0}")
    })?;
    w.writeln("};")
}

pub fn emit<W: Write>(
    w: &mut Writer<W>,
    ir: &Ir,
    doc: &roxmltree::Document,
    defs: &HashSet<EcoString, RandomState>,
) -> anyhow::Result<()> {
    let mut doc_defs = defs.clone();
    doc_defs.insert(EcoString::from("DOC"));

    let full_sections = crate::docwalker::walk(doc, ir, &doc_defs, true)?;
    let man_sections = crate::docwalker::walk(doc, ir, &doc_defs, false)?;

    for cmd in &ir.commands {
        let title = format!("{} COMMAND", cmd.name.to_uppercase());
        cmd.has_doc.set(full_sections.contains_key(title.as_str()));
    }

    let full_doc = format!("=pod\n\n{}=cut\n", crate::docwalker::render_document(&man_sections));
    let full_usage_text = pod_to_text(&full_doc, 4, true)?;

    w.sysinclude("getopt.h")?;
    w.sysinclude("stdlib.h")?;
    w.sysinclude("string.h")?;
    w.include("util.h")?;
    w.include("autocmd.h")?;
    w.blank()?;

    w.writeln(&format!("const unsigned char full_usage[] = {};", quote_string(&full_usage_text)))?;
    w.blank()?;

    for og in &ir.optgroups {
        emit_args_fn(w, og)?;
    }

    for cmd in &ir.commands {
        if cmd.has_doc.get() {
            let title = format!("{} COMMAND", cmd.name.to_uppercase());
            let cmd_pod = format!("=pod\n\n=head1 DESCRIPTION\n\n{}=cut\n", full_sections[title.as_str()]);
            let text = pod_to_text(&cmd_pod, 4, false)?;
            w.writeln(&format!("static const unsigned char {}_usage[] = {};", cmd.symbol, quote_string(&text)))?;
            w.blank()?;
        }
        emit_make_args_cmd(w, cmd)?;
        emit_parse_args_cmd(w, cmd)?;
        emit_dispatch(w, cmd)?;
    }

    emit_autocmds(w, ir)?;
    Ok(())
}
