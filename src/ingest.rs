//! The markup-ignoring pass that slurps the declaration source into an
//! [`Ir`] (§4.1, §3). Scope legality is enforced with an explicit tagged
//! stack per Design Note "Scope stack", rather than the source's
//! dict-of-open-scopes trick.

use crate::error::{context_error, schema_error};
use crate::ident::check_id_dash;
use crate::reader::{self, Attrs, Handler};
use crate::types::{Argument, Command, Ir, Opt, OptGroup};
use ecow::EcoString;
use foldhash::fast::RandomState;
use std::collections::HashSet;
use std::rc::Rc;

enum Frame {
    Command(Command),
    Optgroup(OptGroup),
    Option(Opt),
    Argument(Argument),
    OptgroupRef(Rc<OptGroup>),
}

struct IngestHandler {
    stack: Vec<Frame>,
    optgroups: Vec<Rc<OptGroup>>,
    commands: Vec<Command>,
    known_commands: HashSet<EcoString, RandomState>,
}

impl IngestHandler {
    fn new() -> Self {
        IngestHandler {
            stack: Vec::new(),
            optgroups: Vec::new(),
            commands: Vec::new(),
            known_commands: HashSet::with_hasher(RandomState::default()),
        }
    }

    fn find_optgroup(&self, name: &str) -> Option<Rc<OptGroup>> {
        self.optgroups.iter().find(|og| og.name == name).cloned()
    }
}

fn parse_short(attrs: &Attrs) -> anyhow::Result<Option<char>> {
    match attrs.get("short") {
        None => Ok(None),
        Some(s) => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Some(c)),
                _ => Err(schema_error(format!("illegal short option name {s:?}"))),
            }
        }
    }
}

impl Handler for IngestHandler {
    fn start_command(&mut self, attrs: &Attrs) -> anyhow::Result<()> {
        if !self.stack.is_empty() {
            return Err(context_error("invalid context"));
        }
        let names_attr = attrs.get_required("names")?;
        let names: Vec<EcoString> = names_attr
            .split(',')
            .map(|n| check_id_dash(n.trim()))
            .collect::<anyhow::Result<_>>()?;
        if names.is_empty() {
            return Err(schema_error("no names given"));
        }
        let symbol = crate::ident::dash_to_underscore(&names[0]);
        let mut nameset: HashSet<EcoString, RandomState> = names.iter().cloned().collect();
        nameset.insert(symbol.clone());
        let duplicates: Vec<&EcoString> = nameset.intersection(&self.known_commands).collect();
        if !duplicates.is_empty() {
            let mut sorted = duplicates;
            sorted.sort();
            return Err(schema_error(format!("duplicate command names: {sorted:?}")));
        }
        self.known_commands.extend(nameset);
        let export_parse_args = attrs
            .get("export_parse_args")
            .map(crate::ident::check_bool)
            .transpose()?
            .unwrap_or(false);
        let command = Command::new(&names[0], names[1..].to_vec(), export_parse_args)?;
        self.stack.push(Frame::Command(command));
        Ok(())
    }

    fn end_command(&mut self) -> anyhow::Result<()> {
        match self.stack.pop() {
            Some(Frame::Command(command)) => {
                self.commands.push(command);
                Ok(())
            }
            _ => Err(context_error("unbalanced command close")),
        }
    }

    fn start_optgroup(&mut self, attrs: &Attrs) -> anyhow::Result<()> {
        let legal = self.stack.is_empty() || (self.stack.len() == 1 && matches!(self.stack[0], Frame::Command(_)));
        if !legal {
            return Err(context_error("invalid context"));
        }
        let name = attrs.get_required("name")?;
        let forward = attrs.get("forward").unwrap_or("yes");
        let export_emit_args = attrs.get("export_emit_args").unwrap_or("no");
        let human = attrs.get("human");
        let mut og = OptGroup::new(name, forward, export_emit_args, human)?;
        if matches!(self.stack.last(), Some(Frame::Command(_))) {
            og.private = true;
        }
        self.stack.push(Frame::Optgroup(og));
        Ok(())
    }

    fn end_optgroup(&mut self) -> anyhow::Result<()> {
        let og = match self.stack.pop() {
            Some(Frame::Optgroup(og)) => og,
            _ => return Err(context_error("unbalanced optgroup close")),
        };
        let rc = Rc::new(og);
        self.optgroups.push(rc.clone());
        if let Some(Frame::Command(command)) = self.stack.last_mut() {
            command.add_optgroup(rc)?;
        }
        Ok(())
    }

    fn start_option(&mut self, attrs: &Attrs) -> anyhow::Result<()> {
        if !matches!(self.stack.last(), Some(Frame::Optgroup(_))) {
            return Err(context_error("invalid context"));
        }
        let short = parse_short(attrs)?;
        let long = attrs.get_required("long")?;
        let arg = attrs.get("arg");
        let ty = attrs.get("type");
        let accumulate = attrs.get("accumulate");
        let option = Opt::new(short, long, arg, ty, accumulate)?;
        self.stack.push(Frame::Option(option));
        Ok(())
    }

    fn end_option(&mut self) -> anyhow::Result<()> {
        let option = match self.stack.pop() {
            Some(Frame::Option(option)) => option,
            _ => return Err(context_error("unbalanced option close")),
        };
        match self.stack.last_mut() {
            Some(Frame::Optgroup(og)) => og.add_option(option),
            _ => Err(context_error("option closed outside optgroup")),
        }
    }

    fn start_argument(&mut self, attrs: &Attrs) -> anyhow::Result<()> {
        if !matches!(self.stack.last(), Some(Frame::Command(_))) {
            return Err(context_error("invalid context"));
        }
        let name = attrs.get_required("name")?;
        let optional = attrs.get("optional").unwrap_or("no");
        let repeat = attrs.get("repeat").unwrap_or("no");
        let ty = attrs.get("type").unwrap_or("string");
        let argument = Argument::new(name, ty, repeat, optional)?;
        self.stack.push(Frame::Argument(argument));
        Ok(())
    }

    fn end_argument(&mut self) -> anyhow::Result<()> {
        let argument = match self.stack.pop() {
            Some(Frame::Argument(argument)) => argument,
            _ => return Err(context_error("unbalanced argument close")),
        };
        match self.stack.last_mut() {
            Some(Frame::Command(command)) => command.add_argument(argument),
            _ => Err(context_error("argument closed outside command")),
        }
    }

    fn start_optgroup_reference(&mut self, attrs: &Attrs) -> anyhow::Result<()> {
        if !matches!(self.stack.last(), Some(Frame::Command(_))) {
            return Err(context_error("invalid context"));
        }
        let name = attrs.get_required("name")?;
        let og = self.find_optgroup(name).ok_or_else(|| schema_error(format!("no optgroup called {name:?}")))?;
        self.stack.push(Frame::OptgroupRef(og));
        Ok(())
    }

    fn end_optgroup_reference(&mut self) -> anyhow::Result<()> {
        let og = match self.stack.pop() {
            Some(Frame::OptgroupRef(og)) => og,
            _ => return Err(context_error("unbalanced optgroup-reference close")),
        };
        match self.stack.last_mut() {
            Some(Frame::Command(command)) => command.add_optgroup(og),
            _ => Err(context_error("optgroup-reference closed outside command")),
        }
    }

    fn start_markup(&mut self, _tag: &str, _attrs: &Attrs) -> anyhow::Result<()> {
        Ok(())
    }

    fn end_markup(&mut self, _tag: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn cdata(&mut self, _text: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

pub fn ingest(
    doc: &roxmltree::Document,
    defs: &HashSet<EcoString, RandomState>,
) -> anyhow::Result<Ir> {
    let mut handler = IngestHandler::new();
    reader::run(doc, defs, &mut handler)?;
    if !handler.stack.is_empty() {
        return Err(context_error("unclosed element at end of document"));
    }
    Ok(Ir { optgroups: handler.optgroups, commands: handler.commands })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str, defs: &[&str]) -> anyhow::Result<Ir> {
        let doc = roxmltree::Document::parse(xml).unwrap();
        let defs: HashSet<EcoString, RandomState> =
            defs.iter().map(|d| EcoString::from(*d)).collect();
        ingest(&doc, &defs)
    }

    #[test]
    fn single_command_with_mandatory_argument() {
        let ir = parse(
            r#"<usage program="p" summary="s"><command names="hello"><argument name="who"/></command></usage>"#,
            &[],
        )
        .unwrap();
        assert_eq!(ir.commands.len(), 1);
        assert_eq!(ir.commands[0].arguments.len(), 1);
        assert_eq!(ir.commands[0].arguments[0].name, "who");
    }

    #[test]
    fn shared_optgroup_referenced_twice() {
        let ir = parse(
            r#"<usage program="p" summary="s">
                 <optgroup name="common"><option long="verbose"/></optgroup>
                 <command names="build"><optgroup-reference name="common"/></command>
                 <command names="test"><optgroup-reference name="common"/></command>
               </usage>"#,
            &[],
        )
        .unwrap();
        assert_eq!(ir.optgroups.len(), 1);
        assert_eq!(ir.commands.len(), 2);
        assert!(Rc::ptr_eq(&ir.commands[0].optgroups[0], &ir.commands[1].optgroups[0]));
    }

    #[test]
    fn duplicate_command_name_is_fatal() {
        let err = parse(
            r#"<usage program="p" summary="s">
                 <command names="build"/>
                 <command names="build"/>
               </usage>"#,
            &[],
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate command names"));
    }

    #[test]
    fn conditional_gating_respects_defs() {
        let xml = r#"<usage program="p" summary="s">
            <?ifdef DOC?><command names="hidden"/><?endif?>
        </usage>"#;
        let without = parse(xml, &[]).unwrap();
        assert!(without.commands.is_empty());
        let with = parse(xml, &["DOC"]).unwrap();
        assert_eq!(with.commands.len(), 1);
    }

    #[test]
    fn unmatched_endif_is_fatal() {
        let xml = r#"<usage program="p" summary="s"><?endif?></usage>"#;
        assert!(parse(xml, &[]).is_err());
    }

    #[test]
    fn private_optgroup_not_shared() {
        let ir = parse(
            r#"<usage program="p" summary="s">
                 <command names="build">
                   <optgroup name="local"><option long="force"/></optgroup>
                 </command>
               </usage>"#,
            &[],
        )
        .unwrap();
        assert_eq!(ir.optgroups.len(), 1);
        assert!(ir.optgroups[0].private);
    }
}
