//! The shared event-dispatch loop described in §4.1 and Design Note
//! "Two-pass coupling": one generic tree walk over the parsed document,
//! with the conditional-compilation stack and attribute normalization
//! factored out so the ingest pass and the documentation pass can plug in
//! distinct handlers for the same traversal.

use crate::error::context_error;
use ecow::EcoString;
use foldhash::fast::RandomState;
use roxmltree::{Node, NodeType};
use std::collections::HashSet;

pub const MARKUP_TAGS: &[&str] = &[
    "b", "i", "tt", "section", "ul", "li", "dl", "dt", "dd", "usage", "synopsis", "vspace", "pre",
];

/// A start-element's attributes, keyed by their dash-normalized name (§4.1
/// "Attribute name normalization").
pub struct Attrs<'a, 'b> {
    node: Node<'a, 'b>,
}

impl<'a, 'b> Attrs<'a, 'b> {
    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.node
            .attributes()
            .find(|attr| attr.name().replace('-', "_") == key)
            .map(|attr| attr.value())
    }

    pub fn get_required(&self, key: &str) -> anyhow::Result<&'a str> {
        self.get(key).ok_or_else(|| context_error(format!("missing required attribute {key:?}")))
    }
}

pub trait Handler {
    fn start_command(&mut self, attrs: &Attrs) -> anyhow::Result<()>;
    fn end_command(&mut self) -> anyhow::Result<()>;
    fn start_optgroup(&mut self, attrs: &Attrs) -> anyhow::Result<()>;
    fn end_optgroup(&mut self) -> anyhow::Result<()>;
    fn start_option(&mut self, attrs: &Attrs) -> anyhow::Result<()>;
    fn end_option(&mut self) -> anyhow::Result<()>;
    fn start_argument(&mut self, attrs: &Attrs) -> anyhow::Result<()>;
    fn end_argument(&mut self) -> anyhow::Result<()>;
    fn start_optgroup_reference(&mut self, attrs: &Attrs) -> anyhow::Result<()>;
    fn end_optgroup_reference(&mut self) -> anyhow::Result<()>;
    fn start_markup(&mut self, tag: &str, attrs: &Attrs) -> anyhow::Result<()>;
    fn end_markup(&mut self, tag: &str) -> anyhow::Result<()>;
    fn cdata(&mut self, text: &str) -> anyhow::Result<()>;
}

struct IfdefFrame {
    enabled: bool,
    depth: u32,
}

struct WalkState<'a> {
    defs: &'a HashSet<EcoString, RandomState>,
    frames: Vec<IfdefFrame>,
    depth: u32,
}

impl<'a> WalkState<'a> {
    fn enabled(&self) -> bool {
        self.frames.iter().all(|f| f.enabled)
    }

    fn handle_pi(&mut self, target: &str, value: Option<&str>) -> anyhow::Result<()> {
        match target {
            "ifdef" | "ifndef" => {
                let args: Vec<&str> = value.map(str::split_whitespace).into_iter().flatten().collect();
                if args.is_empty() {
                    return Err(context_error("no ifdef condition supplied"));
                }
                if args.len() > 1 {
                    return Err(context_error("ifdef syntax error"));
                }
                let defined = self.defs.contains(args[0]);
                let enabled = defined == (target == "ifdef");
                self.frames.push(IfdefFrame { enabled, depth: self.depth });
                Ok(())
            }
            "endif" => {
                if value.map(|v| !v.trim().is_empty()).unwrap_or(false) {
                    return Err(context_error("invalid endif syntax"));
                }
                let frame = self.frames.pop().ok_or_else(|| context_error("unmatched endif"))?;
                if frame.depth != self.depth {
                    return Err(context_error("badly formed ifdef: levels do not match"));
                }
                Ok(())
            }
            other => Err(context_error(format!("unknown processing instruction {other:?}"))),
        }
    }
}

fn dispatch_start<H: Handler>(tag: &str, attrs: &Attrs, handler: &mut H) -> anyhow::Result<()> {
    match tag {
        "command" => handler.start_command(attrs),
        "optgroup" => handler.start_optgroup(attrs),
        "option" => handler.start_option(attrs),
        "argument" => handler.start_argument(attrs),
        "optgroup-reference" => handler.start_optgroup_reference(attrs),
        t if MARKUP_TAGS.contains(&t) => handler.start_markup(t, attrs),
        other => Err(context_error(format!("unknown element {other:?}"))),
    }
}

fn dispatch_end<H: Handler>(tag: &str, handler: &mut H) -> anyhow::Result<()> {
    match tag {
        "command" => handler.end_command(),
        "optgroup" => handler.end_optgroup(),
        "option" => handler.end_option(),
        "argument" => handler.end_argument(),
        "optgroup-reference" => handler.end_optgroup_reference(),
        t if MARKUP_TAGS.contains(&t) => handler.end_markup(t),
        other => Err(context_error(format!("unknown element {other:?}"))),
    }
}

fn walk<H: Handler>(node: Node, state: &mut WalkState, handler: &mut H) -> anyhow::Result<()> {
    // Element-nesting depth is tracked unconditionally, even while a
    // conditional frame is disabled, so that `endif` depth checks stay
    // correct regardless of what got suppressed in between.
    state.depth += 1;
    let was_enabled = state.enabled();
    let tag = node.tag_name().name();
    let attrs = Attrs { node };
    if was_enabled {
        dispatch_start(tag, &attrs, handler)?;
    }
    for child in node.children() {
        match child.node_type() {
            NodeType::Element => walk(child, state, handler)?,
            NodeType::Text => {
                if state.enabled() {
                    if let Some(text) = child.text() {
                        handler.cdata(text)?;
                    }
                }
            }
            NodeType::PI => {
                if let Some(pi) = child.pi() {
                    state.handle_pi(pi.target, pi.value)?;
                }
            }
            NodeType::Comment | NodeType::Root => {}
        }
    }
    if was_enabled {
        dispatch_end(tag, handler)?;
    }
    state.depth -= 1;
    Ok(())
}

pub fn run<H: Handler>(
    doc: &roxmltree::Document,
    defs: &HashSet<EcoString, RandomState>,
    handler: &mut H,
) -> anyhow::Result<()> {
    let mut state = WalkState { defs, frames: Vec::new(), depth: 0 };
    walk(doc.root_element(), &mut state, handler)?;
    if !state.frames.is_empty() {
        return Err(context_error("unmatched ifdef at end of document"));
    }
    Ok(())
}
