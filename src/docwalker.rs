//! The documentation pass (§4.4): walks the same source a second (and
//! third) time with markup handlers active, building a section-title to
//! section-body map that the implementation and man-page emitters draw
//! their byte-string literals from.

use crate::error::context_error;
use crate::reader::{self, Attrs, Handler};
use crate::types::{Command, Ir, Opt, OptGroup};
use ecow::EcoString;
use foldhash::fast::RandomState;
use std::collections::HashMap;
use std::collections::HashSet;

fn escape_specials(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("E<lt>"),
            '>' => out.push_str("E<gt>"),
            '|' => out.push_str("E<verbar>"),
            '/' => out.push_str("E<sol>"),
            c => out.push(c),
        }
    }
    out
}

fn oxford_join(items: &[String]) -> String {
    match items.len() {
        0 => String::new(),
        1 => items[0].clone(),
        2 => format!("{} and {}", items[0], items[1]),
        _ => {
            let (last, rest) = items.split_last().expect("non-empty");
            format!("{}, and {}", rest.join(", "), last)
        }
    }
}

fn option_item_label(o: &Opt) -> String {
    match (o.short, &o.arg) {
        (Some(s), Some(a)) => format!("B<-{s}>I<{a}>, B<--{}>=I<{a}>", o.long),
        (Some(s), None) => format!("B<-{s}>, B<--{}>", o.long),
        (None, Some(a)) => format!("B<--{}>=I<{a}>", o.long),
        (None, None) => format!("B<--{}>", o.long),
    }
}

fn option_flag_label(o: &Opt) -> String {
    match o.short {
        Some(s) => format!("B<-{s}>/B<--{}>", o.long),
        None => format!("B<--{}>", o.long),
    }
}

struct DocWalker<'ir> {
    ir: &'ir Ir,
    full_optgroups: bool,
    program: String,
    pre_depth: u32,
    pre_buffer: String,
    current_paragraph: String,
    current_title: Option<String>,
    buffer: String,
    sections: HashMap<String, String, RandomState>,
    /// Section titles in the order they were first opened (§4.4): there is
    /// no fixed NAME/SYNOPSIS/optgroups/commands list, free `<section>`
    /// elements interleave wherever they occur in the source.
    order: Vec<String>,
    in_command: bool,
    current_command_name: Option<EcoString>,
    optgroup_is_private: Vec<bool>,
}

impl<'ir> DocWalker<'ir> {
    fn new(ir: &'ir Ir, full_optgroups: bool) -> Self {
        DocWalker {
            ir,
            full_optgroups,
            program: String::new(),
            pre_depth: 0,
            pre_buffer: String::new(),
            current_paragraph: String::new(),
            current_title: None,
            buffer: String::new(),
            sections: HashMap::with_hasher(RandomState::default()),
            order: Vec::new(),
            in_command: false,
            current_command_name: None,
            optgroup_is_private: Vec::new(),
        }
    }

    fn find_command(&self, name: &str) -> Option<&'ir Command> {
        self.ir.commands.iter().find(|c| c.name == name)
    }

    fn find_optgroup(&self, name: &str) -> Option<&'ir std::rc::Rc<OptGroup>> {
        self.ir.optgroups.iter().find(|og| og.name == name)
    }

    fn flush_paragraph(&mut self) {
        if self.pre_depth > 0 {
            return;
        }
        if !self.current_paragraph.trim().is_empty() {
            self.buffer.push_str(&self.current_paragraph);
            self.buffer.push_str("\n\n");
        }
        self.current_paragraph.clear();
    }

    /// Opens a new buffered section, recording its title in declaration
    /// order. Call before writing anything into `self.buffer` for it.
    fn open_section(&mut self, title: String) {
        self.order.push(title.clone());
        self.current_title = Some(title);
    }

    fn close_section(&mut self) {
        if let Some(title) = self.current_title.take() {
            self.sections.insert(title, std::mem::take(&mut self.buffer));
        } else {
            self.buffer.clear();
        }
    }

    /// Inserts a section whose body is computed outright rather than built
    /// up through `self.buffer` (NAME, SYNOPSIS), while still recording its
    /// place in declaration order.
    fn insert_section(&mut self, title: String, body: String) {
        self.order.push(title.clone());
        self.sections.insert(title, body);
    }

    fn render_verbose_synopsis(&self, cmd: &Command) -> String {
        let mut s = format!("B<{}> B<{}>", self.program, cmd.name);
        let bundle: String = cmd
            .iter_options()
            .filter_map(|(_, o)| if o.arg.is_none() { o.short } else { None })
            .collect();
        if !bundle.is_empty() {
            s.push_str(&format!(" [-{bundle}]"));
        }
        for (_, o) in cmd.iter_options() {
            match (o.short, &o.arg) {
                (Some(sh), Some(a)) => s.push_str(&format!(" [-{sh} I<{a}>|--{}=I<{a}>]", o.long)),
                (Some(sh), None) => s.push_str(&format!(" [-{sh}|--{}]", o.long)),
                (None, Some(a)) => s.push_str(&format!(" [--{}=I<{a}>]", o.long)),
                (None, None) => s.push_str(&format!(" [--{}]", o.long)),
            }
        }
        for arg in &cmd.arguments {
            let rendered = if arg.repeat { format!("I<{}...>", arg.name) } else { format!("I<{}>", arg.name) };
            if arg.optional {
                s.push_str(&format!(" [{rendered}]"));
            } else {
                s.push(' ');
                s.push_str(&rendered);
            }
        }
        s
    }

    fn render_synopsis_line(&self, cmd: &Command) -> String {
        let mut s = format!("B<{}> B<{}>", self.program, cmd.name);
        let has_options = cmd.optgroups.iter().any(|og| !og.options.is_empty());
        if has_options {
            s.push_str(" [options]");
        }
        let mut open_brackets = 0;
        for arg in &cmd.arguments {
            if arg.optional {
                s.push_str(" [");
                open_brackets += 1;
            } else {
                s.push(' ');
            }
            if arg.repeat {
                s.push_str(&format!("I<{}...>", arg.name));
            } else {
                s.push_str(&format!("I<{}>", arg.name));
            }
        }
        s.push_str(&"]".repeat(open_brackets));
        s
    }

    fn render_back_reference(&self, cmd: &Command) -> Option<String> {
        let shared: Vec<_> = cmd.optgroups.iter().filter(|og| !og.private).collect();
        if shared.is_empty() {
            return None;
        }
        let mut sentences = Vec::new();
        for og in shared {
            if og.options.is_empty() {
                continue;
            }
            let flags: Vec<String> = og.options.iter().map(option_flag_label).collect();
            let joined = oxford_join(&flags);
            let title = format!("{} OPTIONS", og.human.clone().unwrap_or_else(|| og.name.clone()).to_uppercase());
            let verb = if og.options.len() == 1 { "is" } else { "are" };
            let noun = if og.options.len() == 1 { "option" } else { "options" };
            sentences.push(format!("The {joined} {noun} {verb} described in the {title} section."));
        }
        if sentences.is_empty() {
            None
        } else {
            Some(sentences.join(" "))
        }
    }
}

impl<'ir> Handler for DocWalker<'ir> {
    fn start_command(&mut self, attrs: &Attrs) -> anyhow::Result<()> {
        let names_attr = attrs.get_required("names")?;
        let first = names_attr.split(',').next().unwrap_or("").trim();
        let cmd = self
            .find_command(first)
            .ok_or_else(|| context_error(format!("unknown command {first:?}")))?;
        self.in_command = true;
        self.current_command_name = Some(cmd.name.clone());
        self.flush_paragraph();
        self.close_section();
        self.open_section(format!("{} COMMAND", cmd.name.to_uppercase()));
        self.buffer.clear();
        self.buffer.push_str(&self.render_verbose_synopsis(cmd));
        self.buffer.push_str("\n\n");
        Ok(())
    }

    fn end_command(&mut self) -> anyhow::Result<()> {
        self.in_command = false;
        self.flush_paragraph();
        if !self.full_optgroups {
            if let Some(name) = self.current_command_name.take() {
                if let Some(cmd) = self.find_command(&name) {
                    if let Some(back) = self.render_back_reference(cmd) {
                        self.buffer.push_str(&back);
                        self.buffer.push_str("\n\n");
                    }
                }
            }
        }
        self.current_command_name = None;
        self.close_section();
        Ok(())
    }

    fn start_optgroup(&mut self, attrs: &Attrs) -> anyhow::Result<()> {
        let name = attrs.get_required("name")?;
        if self.in_command {
            self.optgroup_is_private.push(true);
            return Ok(());
        }
        self.optgroup_is_private.push(false);
        let og = self
            .find_optgroup(name)
            .ok_or_else(|| context_error(format!("unknown optgroup {name:?}")))?
            .clone();
        self.flush_paragraph();
        self.close_section();
        let title = format!("{} OPTIONS", og.human.clone().unwrap_or_else(|| og.name.clone()).to_uppercase());
        self.open_section(title);
        self.buffer.clear();
        for o in &og.options {
            self.buffer.push_str(&format!("=item {}\n\n", option_item_label(o)));
        }
        Ok(())
    }

    fn end_optgroup(&mut self) -> anyhow::Result<()> {
        let was_private = self.optgroup_is_private.pop().unwrap_or(false);
        if was_private {
            return Ok(());
        }
        self.flush_paragraph();
        self.close_section();
        Ok(())
    }

    fn start_option(&mut self, _attrs: &Attrs) -> anyhow::Result<()> {
        Ok(())
    }

    fn end_option(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn start_argument(&mut self, _attrs: &Attrs) -> anyhow::Result<()> {
        Ok(())
    }

    fn end_argument(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn start_optgroup_reference(&mut self, attrs: &Attrs) -> anyhow::Result<()> {
        if !self.full_optgroups {
            return Ok(());
        }
        let name = attrs.get_required("name")?;
        let og = self
            .find_optgroup(name)
            .ok_or_else(|| context_error(format!("unknown optgroup {name:?}")))?;
        let title = format!("{} OPTIONS", og.human.clone().unwrap_or_else(|| og.name.clone()).to_uppercase());
        if let Some(content) = self.sections.get(&title).cloned() {
            self.flush_paragraph();
            self.buffer.push_str(&content);
        }
        Ok(())
    }

    fn end_optgroup_reference(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn start_markup(&mut self, tag: &str, attrs: &Attrs) -> anyhow::Result<()> {
        match tag {
            "usage" => {
                let program = attrs.get_required("program")?;
                let summary = attrs.get_required("summary")?;
                self.program = program.to_string();
                self.insert_section("NAME".to_string(), format!("{program} - {summary}\n\n"));
                Ok(())
            }
            "synopsis" => {
                self.flush_paragraph();
                self.close_section();
                let mut content = String::new();
                for cmd in &self.ir.commands {
                    content.push_str(&self.render_synopsis_line(cmd));
                    content.push_str("\n\n");
                }
                self.insert_section("SYNOPSIS".to_string(), content);
                Ok(())
            }
            "section" => {
                let title = attrs.get_required("name")?;
                self.flush_paragraph();
                self.close_section();
                self.open_section(title.to_uppercase());
                self.buffer.clear();
                Ok(())
            }
            "b" => {
                self.current_paragraph.push_str("B<");
                Ok(())
            }
            "i" => {
                self.current_paragraph.push_str("I<");
                Ok(())
            }
            "tt" => {
                self.current_paragraph.push_str("C<");
                Ok(())
            }
            "vspace" => {
                self.flush_paragraph();
                self.buffer.push_str("Z<>\n\n");
                Ok(())
            }
            "pre" => {
                self.flush_paragraph();
                self.pre_depth += 1;
                Ok(())
            }
            "ul" | "dl" => {
                self.flush_paragraph();
                self.buffer.push_str("=over\n\n");
                Ok(())
            }
            "li" => {
                self.flush_paragraph();
                self.buffer.push_str("=item *\n\n");
                Ok(())
            }
            "dt" => {
                self.flush_paragraph();
                self.current_paragraph.push_str("=item B<");
                Ok(())
            }
            "dd" => Ok(()),
            other => Err(context_error(format!("unhandled markup tag {other:?}"))),
        }
    }

    fn end_markup(&mut self, tag: &str) -> anyhow::Result<()> {
        match tag {
            "usage" | "synopsis" => Ok(()),
            "section" => {
                self.flush_paragraph();
                self.close_section();
                Ok(())
            }
            "b" | "i" | "tt" => {
                self.current_paragraph.push('>');
                Ok(())
            }
            "vspace" => Ok(()),
            "pre" => {
                self.pre_depth -= 1;
                if !self.pre_buffer.is_empty() {
                    for line in self.pre_buffer.lines() {
                        self.buffer.push_str("    ");
                        self.buffer.push_str(line);
                        self.buffer.push('\n');
                    }
                    self.buffer.push('\n');
                    self.pre_buffer.clear();
                }
                Ok(())
            }
            "ul" | "dl" => {
                self.flush_paragraph();
                self.buffer.push_str("=back\n\n");
                Ok(())
            }
            "li" => {
                self.flush_paragraph();
                Ok(())
            }
            "dt" => {
                self.current_paragraph.push('>');
                self.flush_paragraph();
                Ok(())
            }
            "dd" => {
                self.flush_paragraph();
                Ok(())
            }
            other => Err(context_error(format!("unhandled markup tag {other:?}"))),
        }
    }

    fn cdata(&mut self, text: &str) -> anyhow::Result<()> {
        if self.pre_depth > 0 {
            self.pre_buffer.push_str(text);
            return Ok(());
        }
        let collapsed: Vec<&str> = text.split_whitespace().collect();
        if collapsed.is_empty() {
            return Ok(());
        }
        let escaped = escape_specials(&collapsed.join(" "));
        if self.current_paragraph.is_empty() {
            // A zero-width marker precedes a paragraph's first real text,
            // so pod2text never mistakes it for a directive line.
            self.current_paragraph.push_str("Z<>");
        } else if !self.current_paragraph.ends_with(['<', ' ']) {
            self.current_paragraph.push(' ');
        }
        self.current_paragraph.push_str(&escaped);
        Ok(())
    }
}

/// The result of one documentation pass: every captured section body,
/// keyed by title, plus the titles in the order they were first opened —
/// NAME and SYNOPSIS wherever `usage`/`synopsis` appear in the source,
/// free `<section>` headers interleaved with commands and optgroups
/// exactly as declared (§4.4; there is no fixed NAME/SYNOPSIS/optgroups/
/// commands list, sections render in source-declaration order).
pub struct Sections {
    pub bodies: HashMap<String, String, RandomState>,
    pub order: Vec<String>,
}

impl Sections {
    pub fn get(&self, title: &str) -> Option<&str> {
        self.bodies.get(title).map(String::as_str)
    }

    pub fn contains_key(&self, title: &str) -> bool {
        self.bodies.contains_key(title)
    }
}

impl std::ops::Index<&str> for Sections {
    type Output = str;

    fn index(&self, title: &str) -> &str {
        &self.bodies[title]
    }
}

/// Runs one documentation pass over `doc`. `full_optgroups` selects
/// inline optgroup expansion (per-command help blobs) vs. the back-
/// reference man-page mode (§4.4 "Two documentation passes").
pub fn walk(
    doc: &roxmltree::Document,
    ir: &Ir,
    defs: &HashSet<EcoString, RandomState>,
    full_optgroups: bool,
) -> anyhow::Result<Sections> {
    let mut dw = DocWalker::new(ir, full_optgroups);
    reader::run(doc, defs, &mut dw)?;
    dw.flush_paragraph();
    dw.close_section();
    Ok(Sections { bodies: dw.sections, order: dw.order })
}

/// Renders captured section buffers into a structured-manual document:
/// one `=head1 TITLE` per title in `sections.order`, each exactly once
/// (first occurrence wins), in declaration order.
pub fn render_document(sections: &Sections) -> String {
    let mut doc = String::new();
    let mut seen: HashSet<&str, RandomState> = HashSet::with_hasher(RandomState::default());
    for title in &sections.order {
        if !seen.insert(title.as_str()) {
            continue;
        }
        if let Some(body) = sections.get(title) {
            doc.push_str(&format!("=head1 {title}\n\n{body}"));
        }
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oxford_join_handles_small_lists() {
        assert_eq!(oxford_join(&[]), "");
        assert_eq!(oxford_join(&["a".into()]), "a");
        assert_eq!(oxford_join(&["a".into(), "b".into()]), "a and b");
        assert_eq!(oxford_join(&["a".into(), "b".into(), "c".into()]), "a, b, and c");
    }

    #[test]
    fn escape_specials_covers_table() {
        assert_eq!(escape_specials("<a|b/c>"), "E<lt>aE<verbar>bE<sol>cE<gt>");
    }

    #[test]
    fn name_section_and_synopsis_are_captured() {
        let xml = r#"<usage program="tool" summary="does things">
            <synopsis/>
            <command names="build"><argument name="target"/></command>
        </usage>"#;
        let doc = roxmltree::Document::parse(xml).unwrap();
        let defs: HashSet<EcoString, RandomState> = HashSet::with_hasher(RandomState::default());
        let ir = crate::ingest::ingest(&doc, &defs).unwrap();
        let sections = walk(&doc, &ir, &defs, false).unwrap();
        assert!(sections["NAME"].contains("tool - does things"));
        assert!(sections["SYNOPSIS"].contains("I<target>"));
        assert!(sections.contains_key("BUILD COMMAND"));
    }
}
