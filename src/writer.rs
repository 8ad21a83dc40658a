//! C-source emission helpers (§4.2, §4.3 "Output formatting"). Replaces the
//! source's context-manager indentation tricks with closures: each scoped
//! construct takes a `FnOnce(&mut Self) -> io::Result<()>` body and handles
//! the opening/closing lines itself.

use ecow::EcoString;
use std::io::{self, Write};

pub const INDENT_WIDTH: usize = 2;

pub struct FunctionSignature {
    pub ret: String,
    pub name: EcoString,
    pub args: Vec<(String, String)>,
}

impl FunctionSignature {
    pub fn new(ret: impl Into<String>, name: impl Into<EcoString>, args: Vec<(String, String)>) -> Self {
        FunctionSignature { ret: ret.into(), name: name.into(), args }
    }

    pub fn args_joined(&self) -> String {
        if self.args.is_empty() {
            return "void".to_string();
        }
        self.args.iter().map(|(ty, name)| format!("{ty} {name}")).collect::<Vec<_>>().join(", ")
    }

    fn header(&self, is_static: bool) -> String {
        let storage = if is_static { "static " } else { "" };
        format!("{storage}{} {}({})", self.ret, self.name, self.args_joined())
    }
}

pub struct Writer<W: Write> {
    out: W,
    indent: u32,
}

impl<W: Write> Writer<W> {
    pub fn new(out: W) -> Self {
        Writer { out, indent: 0 }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn writeln(&mut self, text: &str) -> io::Result<()> {
        if text.is_empty() {
            writeln!(self.out)
        } else {
            writeln!(self.out, "{}{}", " ".repeat(self.indent as usize * INDENT_WIDTH), text)
        }
    }

    pub fn blank(&mut self) -> io::Result<()> {
        writeln!(self.out)
    }

    pub fn indented<F>(&mut self, after: Option<&str>, body: F) -> io::Result<()>
    where
        F: FnOnce(&mut Self) -> io::Result<()>,
    {
        self.indent += 1;
        let result = body(self);
        self.indent -= 1;
        result?;
        if let Some(line) = after {
            self.writeln(line)?;
        }
        Ok(())
    }

    pub fn sysinclude(&mut self, header: &str) -> io::Result<()> {
        self.writeln(&format!("#include <{header}>"))
    }

    pub fn include(&mut self, header: &str) -> io::Result<()> {
        self.writeln(&format!("#include \"{header}\""))
    }

    pub fn struct_definition<F>(&mut self, name: &str, body: F) -> io::Result<()>
    where
        F: FnOnce(&mut Self) -> io::Result<()>,
    {
        self.writeln(&format!("struct {name} {{"))?;
        self.indented(None, body)?;
        self.writeln("};")
    }

    pub fn prototype(&mut self, sig: &FunctionSignature, is_static: bool) -> io::Result<()> {
        self.writeln(&format!("{};", sig.header(is_static)))
    }

    pub fn function_definition<F>(&mut self, sig: &FunctionSignature, is_static: bool, body: F) -> io::Result<()>
    where
        F: FnOnce(&mut Self) -> io::Result<()>,
    {
        self.writeln(&format!("{}", sig.header(is_static)))?;
        self.writeln("{")?;
        self.indented(None, body)?;
        self.writeln("}")?;
        self.blank()
    }

    pub fn if_<F>(&mut self, cond: &str, body: F) -> io::Result<()>
    where
        F: FnOnce(&mut Self) -> io::Result<()>,
    {
        self.writeln(&format!("if ({cond}) {{"))?;
        self.indented(None, body)?;
        self.writeln("}")
    }

    pub fn else_<F>(&mut self, body: F) -> io::Result<()>
    where
        F: FnOnce(&mut Self) -> io::Result<()>,
    {
        self.writeln("else {")?;
        self.indented(None, body)?;
        self.writeln("}")
    }

    pub fn while_<F>(&mut self, cond: &str, body: F) -> io::Result<()>
    where
        F: FnOnce(&mut Self) -> io::Result<()>,
    {
        self.writeln(&format!("while ({cond}) {{"))?;
        self.indented(None, body)?;
        self.writeln("}")
    }

    pub fn switch<F>(&mut self, value: &str, body: F) -> io::Result<()>
    where
        F: FnOnce(&mut Switch<'_, W>) -> io::Result<()>,
    {
        self.writeln(&format!("switch ({value}) {{"))?;
        self.indent += 1;
        let mut switch = Switch { w: self };
        let result = body(&mut switch);
        self.indent -= 1;
        result?;
        self.writeln("}")
    }
}

pub struct Switch<'w, W: Write> {
    w: &'w mut Writer<W>,
}

impl<'w, W: Write> Switch<'w, W> {
    pub fn case<F>(&mut self, value: &str, body: F) -> io::Result<()>
    where
        F: FnOnce(&mut Writer<W>) -> io::Result<()>,
    {
        self.w.writeln(&format!("case {value}:"))?;
        self.w.indent += 1;
        let result = body(self.w);
        result?;
        self.w.writeln("break;")?;
        self.w.indent -= 1;
        Ok(())
    }

    pub fn default<F>(&mut self, body: F) -> io::Result<()>
    where
        F: FnOnce(&mut Writer<W>) -> io::Result<()>,
    {
        self.w.writeln("default:")?;
        self.w.indent += 1;
        let result = body(self.w);
        result?;
        self.w.writeln("break;")?;
        self.w.indent -= 1;
        Ok(())
    }
}
