//! The intermediate representation built by ingest (§3) and consumed by
//! every emitter. Entities are immutable after ingest except `Command`'s
//! optgroup/argument lists (which grow during its open scope) and
//! `Command::has_doc`, set late by the implementation emitter.

use crate::error::schema_error;
use crate::ident::{check_bool, check_id, check_id_dash, dash_to_underscore};
use ecow::EcoString;
use foldhash::fast::RandomState;
use std::cell::Cell;
use std::collections::{BTreeSet, HashSet};
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct Opt {
    pub short: Option<char>,
    pub long: EcoString,
    pub symbol: EcoString,
    pub arg: Option<EcoString>,
    pub ty: Option<EcoString>,
    pub accumulate: Option<EcoString>,
}

impl Opt {
    pub fn new(
        short: Option<char>,
        long: &str,
        arg: Option<&str>,
        ty: Option<&str>,
        accumulate: Option<&str>,
    ) -> anyhow::Result<Self> {
        if arg.is_none() && ty.is_some() {
            return Err(schema_error("cannot specify type without arg"));
        }
        let long = check_id_dash(long)?;
        let symbol = check_id(&dash_to_underscore(&long))?;
        let accumulate = accumulate.map(check_id).transpose()?;
        Ok(Opt {
            short,
            long,
            symbol,
            arg: arg.map(EcoString::from),
            ty: ty.map(EcoString::from),
            accumulate,
        })
    }
}

#[derive(Debug)]
pub struct OptGroup {
    pub name: EcoString,
    pub symbol: EcoString,
    pub forward: bool,
    pub export_emit_args: bool,
    pub human: Option<EcoString>,
    pub options: Vec<Opt>,
    pub accumulations: BTreeSet<EcoString>,
    pub private: bool,
    known_options: HashSet<EcoString, RandomState>,
}

impl OptGroup {
    pub fn new(name: &str, forward: &str, export_emit_args: &str, human: Option<&str>) -> anyhow::Result<Self> {
        let name = check_id(name)?;
        Ok(OptGroup {
            symbol: name.clone(),
            name,
            forward: check_bool(forward)?,
            export_emit_args: check_bool(export_emit_args)?,
            human: human.map(EcoString::from),
            options: Vec::new(),
            accumulations: BTreeSet::new(),
            private: false,
            known_options: HashSet::with_hasher(RandomState::default()),
        })
    }

    pub fn add_option(&mut self, option: Opt) -> anyhow::Result<()> {
        let mut new_keys = vec![format!("long:{}", option.long), format!("symbol:{}", option.symbol)];
        if let Some(s) = option.short {
            new_keys.push(format!("short:{s}"));
        }
        let mut conflict: Vec<&String> = new_keys.iter().filter(|k| self.known_options.contains(k.as_str())).collect();
        if !conflict.is_empty() {
            conflict.sort();
            return Err(schema_error(format!("conflicting options: {conflict:?}")));
        }
        for key in new_keys {
            self.known_options.insert(EcoString::from(key));
        }
        if let Some(acc) = &option.accumulate {
            self.accumulations.insert(acc.clone());
        }
        self.options.push(option);
        Ok(())
    }

    pub fn known_options(&self) -> &HashSet<EcoString, RandomState> {
        &self.known_options
    }

    pub fn struct_name(&self) -> EcoString {
        EcoString::from(format!("{}_opts", self.name))
    }
}

#[derive(Debug)]
pub struct Argument {
    pub name: EcoString,
    pub symbol: EcoString,
    pub ty: EcoString,
    pub optional: bool,
    pub repeat: bool,
}

impl Argument {
    pub fn new(name: &str, ty: &str, repeat: &str, optional: &str) -> anyhow::Result<Self> {
        let name = check_id_dash(name)?;
        let symbol = check_id(&dash_to_underscore(&name))?;
        Ok(Argument {
            symbol,
            name,
            ty: EcoString::from(ty),
            repeat: check_bool(repeat)?,
            optional: check_bool(optional)?,
        })
    }
}

#[derive(Debug)]
pub struct Command {
    pub name: EcoString,
    pub symbol: EcoString,
    pub altnames: Vec<EcoString>,
    pub export_parse_args: bool,
    pub optgroups: Vec<Rc<OptGroup>>,
    pub arguments: Vec<Argument>,
    /// Set by the implementation emitter once documentation extraction
    /// has determined whether this command has a usage blob.
    pub has_doc: Cell<bool>,
}

impl Command {
    pub fn new(name: &str, altnames: Vec<EcoString>, export_parse_args: bool) -> anyhow::Result<Self> {
        let name = check_id_dash(name)?;
        let symbol = check_id(&dash_to_underscore(&name))?;
        Ok(Command {
            name,
            symbol,
            altnames,
            export_parse_args,
            optgroups: Vec::new(),
            arguments: Vec::new(),
            has_doc: Cell::new(false),
        })
    }

    pub fn allnames(&self) -> impl Iterator<Item = &EcoString> {
        std::iter::once(&self.name).chain(self.altnames.iter())
    }

    /// Every option of every attached group, paired with the group that
    /// owns it (needed to address the per-group field when recording a
    /// parsed value).
    pub fn iter_options(&self) -> impl Iterator<Item = (&Rc<OptGroup>, &Opt)> {
        self.optgroups.iter().flat_map(|og| og.options.iter().map(move |o| (og, o)))
    }

    pub fn add_optgroup(&mut self, og: Rc<OptGroup>) -> anyhow::Result<()> {
        for existing in &self.optgroups {
            let mut overlap: Vec<&EcoString> = existing.known_options().intersection(og.known_options()).collect();
            if !overlap.is_empty() {
                overlap.sort();
                return Err(schema_error(format!(
                    "optgroup {} conflicts with optgroup {}: {:?}",
                    og.name, existing.name, overlap
                )));
            }
        }
        self.optgroups.push(og);
        Ok(())
    }

    pub fn add_argument(&mut self, argument: Argument) -> anyhow::Result<()> {
        if self.arguments.iter().any(|a| a.name == argument.name) {
            return Err(schema_error(format!("duplicate argument name {:?}", argument.name)));
        }
        if let Some(last) = self.arguments.last() {
            if last.optional && !argument.optional {
                return Err(schema_error("mandatory argument follows optional argument"));
            }
            if last.repeat {
                return Err(schema_error("if argument is repeated, it must be last"));
            }
        }
        self.arguments.push(argument);
        Ok(())
    }

    pub fn struct_name(&self) -> EcoString {
        EcoString::from(format!("cmd_{}_info", self.name))
    }

    pub fn dispatch_fn_name(&self) -> EcoString {
        EcoString::from(format!("{}_dispatch", self.symbol))
    }

    pub fn main_fn_name(&self) -> EcoString {
        EcoString::from(format!("{}_main", self.symbol))
    }

    pub fn make_args_fn_name(&self) -> EcoString {
        EcoString::from(format!("make_args_cmd_{}", self.name))
    }

    pub fn parse_args_fn_name(&self) -> EcoString {
        EcoString::from(format!("parse_args_cmd_{}", self.symbol))
    }
}

/// The full result of ingest: every optgroup (shared and private) in
/// declaration order, and every command in declaration order.
#[derive(Debug, Default)]
pub struct Ir {
    pub optgroups: Vec<Rc<OptGroup>>,
    pub commands: Vec<Command>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optgroup_rejects_conflicting_long_names() {
        let mut og = OptGroup::new("style", "yes", "no", None).unwrap();
        og.add_option(Opt::new(None, "verbose", None, None, None).unwrap()).unwrap();
        let err = og.add_option(Opt::new(Some('x'), "verbose", None, None, None).unwrap()).unwrap_err();
        assert!(err.to_string().contains("conflicting options"));
    }

    #[test]
    fn optgroup_rejects_conflicting_short_names() {
        let mut og = OptGroup::new("style", "yes", "no", None).unwrap();
        og.add_option(Opt::new(Some('v'), "verbose", None, None, None).unwrap()).unwrap();
        let err = og.add_option(Opt::new(Some('v'), "verify", None, None, None).unwrap()).unwrap_err();
        assert!(err.to_string().contains("conflicting options"));
    }

    #[test]
    fn opt_requires_arg_for_type() {
        assert!(Opt::new(None, "lang", None, Some("string"), None).is_err());
        assert!(Opt::new(None, "lang", Some("L"), Some("string"), None).is_ok());
    }

    #[test]
    fn command_rejects_mandatory_after_optional() {
        let mut cmd = Command::new("build", vec![], false).unwrap();
        cmd.add_argument(Argument::new("src", "string", "no", "yes").unwrap()).unwrap();
        let err = cmd.add_argument(Argument::new("dst", "string", "no", "no").unwrap()).unwrap_err();
        assert!(err.to_string().contains("mandatory argument follows optional"));
    }

    #[test]
    fn command_rejects_argument_after_repeat() {
        let mut cmd = Command::new("build", vec![], false).unwrap();
        cmd.add_argument(Argument::new("rest", "string", "yes", "yes").unwrap()).unwrap();
        let err = cmd.add_argument(Argument::new("more", "string", "no", "yes").unwrap()).unwrap_err();
        assert!(err.to_string().contains("must be last"));
    }

    #[test]
    fn command_rejects_conflicting_optgroups() {
        let mut og_a = OptGroup::new("a", "yes", "no", None).unwrap();
        og_a.add_option(Opt::new(Some('v'), "verbose", None, None, None).unwrap()).unwrap();
        let mut og_b = OptGroup::new("b", "yes", "no", None).unwrap();
        og_b.add_option(Opt::new(Some('v'), "verbose", None, None, None).unwrap()).unwrap();

        let mut cmd = Command::new("run", vec![], false).unwrap();
        cmd.add_optgroup(Rc::new(og_a)).unwrap();
        let err = cmd.add_optgroup(Rc::new(og_b)).unwrap_err();
        assert!(err.to_string().contains("conflicts with optgroup"));
    }

    #[test]
    fn command_allnames_starts_with_primary() {
        let cmd = Command::new("build", vec![EcoString::from("b")], false).unwrap();
        let names: Vec<&EcoString> = cmd.allnames().collect();
        assert_eq!(names, vec![&EcoString::from("build"), &EcoString::from("b")]);
    }
}
