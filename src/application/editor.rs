//! Structured rich-text editor model.
//!
//! The browser toolbar issues the same [`Command`] set against its own DOM; this model defines what
//! those commands mean, what the serialized HTML looks like and therefore which tags the
//! sanitizer has to allow.
//!
//! The server only uses [`Command::TOOLBAR`] and [`VOCABULARY`] at runtime. [`Editor`] is the
//! reference for `static/js/editor.js`: every command, undo and redo included, is ignored
//! while the surface is unfocused.

use std::fmt::Write as _;

/// Tags (with their attributes) the editor can emit.
pub const VOCABULARY: &[(&str, &[&str])] = &[
    ("p", &[]),
    ("br", &[]),
    ("strong", &[]),
    ("em", &[]),
    ("ul", &[]),
    ("ol", &[]),
    ("li", &[]),
    ("blockquote", &[]),
    ("a", &["href"]),
    ("img", &["src", "alt"]),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Bold,
    Italic,
    BulletList,
    OrderedList,
    Blockquote,
    Link(String),
    Image(String),
    Undo,
    Redo,
}

impl Command {
    /// Command names and button labels, in toolbar order.
    pub const TOOLBAR: [(&'static str, &'static str); 9] = [
        ("bold", "Bold"),
        ("italic", "Italic"),
        ("bulletList", "Bullet list"),
        ("orderedList", "Numbered list"),
        ("blockquote", "Quote"),
        ("link", "Link"),
        ("image", "Image"),
        ("undo", "Undo"),
        ("redo", "Redo"),
    ];

    /// Parse the toolbar's `data-command` name. Link and image commands carry their argument.
    pub fn parse(name: &str, argument: Option<&str>) -> Option<Self> {
        let argument = argument.map(str::trim).filter(|arg| !arg.is_empty());
        match name {
            "bold" => Some(Self::Bold),
            "italic" => Some(Self::Italic),
            "bulletList" => Some(Self::BulletList),
            "orderedList" => Some(Self::OrderedList),
            "blockquote" => Some(Self::Blockquote),
            "link" => argument.map(|href| Self::Link(href.to_string())),
            "image" => argument.map(|src| Self::Image(src.to_string())),
            "undo" => Some(Self::Undo),
            "redo" => Some(Self::Redo),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Marks {
    pub bold: bool,
    pub italic: bool,
    pub link: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum Flag {
    Bold,
    Italic,
}

impl Flag {
    fn get(self, marks: &Marks) -> bool {
        match self {
            Flag::Bold => marks.bold,
            Flag::Italic => marks.italic,
        }
    }

    fn set(self, marks: &mut Marks, on: bool) {
        match self {
            Flag::Bold => marks.bold = on,
            Flag::Italic => marks.italic = on,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text { text: String, marks: Marks },
    Image { src: String, alt: String },
    Break,
}

impl Inline {
    fn len(&self) -> usize {
        match self {
            Inline::Text { text, .. } => text.chars().count(),
            Inline::Image { .. } | Inline::Break => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    BulletItem,
    OrderedItem,
    Quote,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub inlines: Vec<Inline>,
}

impl Block {
    fn empty(kind: BlockKind) -> Self {
        Self {
            kind,
            inlines: Vec::new(),
        }
    }

    fn len(&self) -> usize {
        self.inlines.iter().map(Inline::len).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            blocks: vec![Block::empty(BlockKind::Paragraph)],
        }
    }
}

/// A character range inside one block. `start == end` is a caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub block: usize,
    pub start: usize,
    pub end: usize,
}

impl Selection {
    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

pub type ChangeHandler = Box<dyn FnMut(&str) + Send>;

#[derive(Default)]
pub struct Editor {
    document: Document,
    focused: bool,
    selection: Option<Selection>,
    undo: Vec<Document>,
    redo: Vec<Document>,
    on_change: Option<ChangeHandler>,
}

impl Editor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the callback that receives the full HTML after every effective edit.
    pub fn on_change(&mut self, handler: impl FnMut(&str) + Send + 'static) {
        self.on_change = Some(Box::new(handler));
    }

    pub fn focus(&mut self) {
        self.focused = true;
    }

    pub fn blur(&mut self) {
        self.focused = false;
    }

    pub fn has_focus(&self) -> bool {
        self.focused
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    /// Select `anchor..head` inside `block`. Out-of-range values are clamped.
    pub fn select(&mut self, block: usize, anchor: usize, head: usize) {
        let block = block.min(self.document.blocks.len() - 1);
        let len = self.document.blocks[block].len();
        let (anchor, head) = (anchor.min(len), head.min(len));
        self.selection = Some(Selection {
            block,
            start: anchor.min(head),
            end: anchor.max(head),
        });
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    pub fn html(&self) -> String {
        serialize(&self.document)
    }

    /// Replace the selection with `text`, carrying the marks of the text before the caret.
    pub fn insert_text(&mut self, text: &str) -> bool {
        let Some(selection) = self.active_selection() else {
            return false;
        };
        let inserted = text.chars().count();
        self.edit(|document| {
            let inlines = &mut document.blocks[selection.block].inlines;
            let at = replace_range(inlines, selection.start, selection.end);
            let marks = marks_before(inlines, at);
            inlines.insert(
                at,
                Inline::Text {
                    text: text.to_string(),
                    marks,
                },
            );
            normalize(inlines);
            Some(caret(selection.block, selection.start + inserted))
        })
    }

    /// Insert a hard line break (`<br>`) at the caret.
    pub fn insert_break(&mut self) -> bool {
        let Some(selection) = self.active_selection() else {
            return false;
        };
        self.edit(|document| {
            let inlines = &mut document.blocks[selection.block].inlines;
            let at = replace_range(inlines, selection.start, selection.end);
            inlines.insert(at, Inline::Break);
            normalize(inlines);
            Some(caret(selection.block, selection.start + 1))
        })
    }

    /// Split the current block at the caret. The new block keeps the kind, so lists continue.
    pub fn split_block(&mut self) -> bool {
        let Some(selection) = self.active_selection() else {
            return false;
        };
        self.edit(|document| {
            let block = &mut document.blocks[selection.block];
            let at = replace_range(&mut block.inlines, selection.start, selection.end);
            let tail = block.inlines.split_off(at);
            normalize(&mut block.inlines);
            let kind = block.kind;
            document.blocks.insert(
                selection.block + 1,
                Block {
                    kind,
                    inlines: tail,
                },
            );
            Some(caret(selection.block + 1, 0))
        })
    }

    /// Run a toolbar command. Returns whether the document changed.
    pub fn apply(&mut self, command: Command) -> bool {
        match command {
            Command::Undo => self.undo(),
            Command::Redo => self.redo(),
            Command::Bold => self.toggle_mark(Flag::Bold),
            Command::Italic => self.toggle_mark(Flag::Italic),
            Command::BulletList => self.toggle_block(BlockKind::BulletItem),
            Command::OrderedList => self.toggle_block(BlockKind::OrderedItem),
            Command::Blockquote => self.toggle_block(BlockKind::Quote),
            Command::Link(href) => self.set_link(href),
            Command::Image(src) => self.insert_image(src),
        }
    }

    fn active_selection(&self) -> Option<Selection> {
        if self.focused { self.selection } else { None }
    }

    fn toggle_mark(&mut self, flag: Flag) -> bool {
        let Some(selection) = self.active_selection().filter(|sel| !sel.is_collapsed()) else {
            return false;
        };
        self.edit(|document| {
            let inlines = &mut document.blocks[selection.block].inlines;
            let range = split_range(inlines, selection.start, selection.end);
            let all_marked = inlines[range.clone()].iter().all(|inline| match inline {
                Inline::Text { marks, .. } => flag.get(marks),
                _ => true,
            });
            for inline in &mut inlines[range] {
                if let Inline::Text { marks, .. } = inline {
                    flag.set(marks, !all_marked);
                }
            }
            normalize(inlines);
            None
        })
    }

    fn set_link(&mut self, href: String) -> bool {
        let Some(selection) = self.active_selection().filter(|sel| !sel.is_collapsed()) else {
            return false;
        };
        self.edit(|document| {
            let inlines = &mut document.blocks[selection.block].inlines;
            let range = split_range(inlines, selection.start, selection.end);
            for inline in &mut inlines[range] {
                if let Inline::Text { marks, .. } = inline {
                    marks.link = Some(href.clone());
                }
            }
            normalize(inlines);
            None
        })
    }

    fn insert_image(&mut self, src: String) -> bool {
        let Some(selection) = self.active_selection() else {
            return false;
        };
        self.edit(|document| {
            let inlines = &mut document.blocks[selection.block].inlines;
            let at = replace_range(inlines, selection.start, selection.end);
            inlines.insert(
                at,
                Inline::Image {
                    src,
                    alt: String::new(),
                },
            );
            normalize(inlines);
            Some(caret(selection.block, selection.start + 1))
        })
    }

    fn toggle_block(&mut self, kind: BlockKind) -> bool {
        let Some(selection) = self.active_selection() else {
            return false;
        };
        self.edit(|document| {
            let block = &mut document.blocks[selection.block];
            block.kind = if block.kind == kind {
                BlockKind::Paragraph
            } else {
                kind
            };
            None
        })
    }

    fn undo(&mut self) -> bool {
        if !self.focused {
            return false;
        }
        let Some(previous) = self.undo.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.document, previous);
        self.redo.push(current);
        self.after_history_move();
        true
    }

    fn redo(&mut self) -> bool {
        if !self.focused {
            return false;
        }
        let Some(next) = self.redo.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.document, next);
        self.undo.push(current);
        self.after_history_move();
        true
    }

    fn after_history_move(&mut self) {
        if let Some(selection) = self.selection {
            self.select(selection.block, selection.start, selection.end);
        }
        self.emit();
    }

    /// Apply `change` to a copy of the document and commit it only if something differs.
    fn edit(&mut self, change: impl FnOnce(&mut Document) -> Option<Selection>) -> bool {
        let mut next = self.document.clone();
        let next_selection = change(&mut next);
        if next == self.document {
            return false;
        }
        let previous = std::mem::replace(&mut self.document, next);
        self.undo.push(previous);
        self.redo.clear();
        if let Some(selection) = next_selection {
            self.selection = Some(selection);
        }
        self.emit();
        true
    }

    fn emit(&mut self) {
        let html = serialize(&self.document);
        if let Some(handler) = self.on_change.as_mut() {
            handler(&html);
        }
    }
}

fn caret(block: usize, offset: usize) -> Selection {
    Selection {
        block,
        start: offset,
        end: offset,
    }
}

/// Split inlines so that `offset` falls on an inline boundary and return that boundary's index.
fn split_at(inlines: &mut Vec<Inline>, offset: usize) -> usize {
    let mut position = 0;
    for index in 0..inlines.len() {
        if position == offset {
            return index;
        }
        let len = inlines[index].len();
        if offset < position + len {
            if let Inline::Text { text, marks } = &mut inlines[index] {
                let byte = text
                    .char_indices()
                    .nth(offset - position)
                    .map_or(text.len(), |(byte, _)| byte);
                let tail = text.split_off(byte);
                let marks = marks.clone();
                inlines.insert(index + 1, Inline::Text { text: tail, marks });
            }
            return index + 1;
        }
        position += len;
    }
    inlines.len()
}

fn split_range(inlines: &mut Vec<Inline>, start: usize, end: usize) -> std::ops::Range<usize> {
    let from = split_at(inlines, start);
    let to = split_at(inlines, end);
    from..to
}

/// Delete `start..end` and return the index where new content should go.
fn replace_range(inlines: &mut Vec<Inline>, start: usize, end: usize) -> usize {
    let range = split_range(inlines, start, end);
    let at = range.start;
    inlines.drain(range);
    at
}

fn marks_before(inlines: &[Inline], index: usize) -> Marks {
    match index.checked_sub(1).and_then(|prev| inlines.get(prev)) {
        Some(Inline::Text { marks, .. }) => marks.clone(),
        _ => Marks::default(),
    }
}

fn normalize(inlines: &mut Vec<Inline>) {
    inlines.retain(|inline| !matches!(inline, Inline::Text { text, .. } if text.is_empty()));
    let mut merged: Vec<Inline> = Vec::with_capacity(inlines.len());
    for inline in inlines.drain(..) {
        if let (
            Some(Inline::Text {
                text: prev_text,
                marks: prev_marks,
            }),
            Inline::Text { text, marks },
        ) = (merged.last_mut(), &inline)
            && prev_marks == marks
        {
            prev_text.push_str(text);
            continue;
        }
        merged.push(inline);
    }
    *inlines = merged;
}

fn serialize(document: &Document) -> String {
    let mut html = String::new();
    let blocks = &document.blocks;
    for (index, block) in blocks.iter().enumerate() {
        let previous = index.checked_sub(1).map(|prev| blocks[prev].kind);
        let next = blocks.get(index + 1).map(|next| next.kind);
        let (wrapper, item) = match block.kind {
            BlockKind::Paragraph => (None, "p"),
            BlockKind::BulletItem => (Some("ul"), "li"),
            BlockKind::OrderedItem => (Some("ol"), "li"),
            BlockKind::Quote => (Some("blockquote"), "p"),
        };
        if let Some(wrapper) = wrapper
            && previous != Some(block.kind)
        {
            let _ = write!(html, "<{wrapper}>");
        }
        let _ = write!(html, "<{item}>");
        for inline in &block.inlines {
            write_inline(&mut html, inline);
        }
        let _ = write!(html, "</{item}>");
        if let Some(wrapper) = wrapper
            && next != Some(block.kind)
        {
            let _ = write!(html, "</{wrapper}>");
        }
    }
    html
}

fn write_inline(html: &mut String, inline: &Inline) {
    match inline {
        Inline::Break => html.push_str("<br>"),
        Inline::Image { src, alt } => {
            let _ = write!(html, "<img src=\"{}\"", escape_attribute(src));
            if !alt.is_empty() {
                let _ = write!(html, " alt=\"{}\"", escape_attribute(alt));
            }
            html.push('>');
        }
        Inline::Text { text, marks } => {
            if let Some(href) = &marks.link {
                let _ = write!(html, "<a href=\"{}\">", escape_attribute(href));
            }
            if marks.bold {
                html.push_str("<strong>");
            }
            if marks.italic {
                html.push_str("<em>");
            }
            html.push_str(&escape_text(text));
            if marks.italic {
                html.push_str("</em>");
            }
            if marks.bold {
                html.push_str("</strong>");
            }
            if marks.link.is_some() {
                html.push_str("</a>");
            }
        }
    }
}

fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn escape_attribute(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn recording_editor() -> (Editor, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut editor = Editor::new();
        editor.on_change(move |html| sink.lock().expect("lock").push(html.to_string()));
        (editor, seen)
    }

    fn typed(text: &str) -> (Editor, Arc<Mutex<Vec<String>>>) {
        let (mut editor, seen) = recording_editor();
        editor.focus();
        editor.select(0, 0, 0);
        editor.insert_text(text);
        (editor, seen)
    }

    #[test]
    fn commands_without_focus_do_nothing() {
        let (mut editor, seen) = recording_editor();
        editor.select(0, 0, 0);
        assert!(!editor.insert_text("hi"));
        assert!(!editor.apply(Command::BulletList));
        assert!(!editor.apply(Command::Undo));
        assert!(seen.lock().expect("lock").is_empty());
        assert_eq!(editor.html(), "<p></p>");
    }

    #[test]
    fn commands_without_selection_do_nothing() {
        let (mut editor, seen) = typed("hello");
        seen.lock().expect("lock").clear();
        editor.clear_selection();
        assert!(!editor.apply(Command::Bold));
        assert!(!editor.apply(Command::Blockquote));
        assert!(seen.lock().expect("lock").is_empty());
    }

    #[test]
    fn each_effective_edit_reports_full_html() {
        let (mut editor, seen) = typed("hello");
        editor.select(0, 0, 5);
        editor.apply(Command::Bold);
        let seen = seen.lock().expect("lock");
        assert_eq!(
            *seen,
            ["<p>hello</p>".to_string(), "<p><strong>hello</strong></p>".to_string()]
        );
    }

    #[test]
    fn mark_on_collapsed_selection_is_not_a_change() {
        let (mut editor, seen) = typed("hello");
        assert!(!editor.apply(Command::Italic));
        assert_eq!(seen.lock().expect("lock").len(), 1);
    }

    #[test]
    fn bold_toggles_on_partial_range() {
        let (mut editor, _) = typed("hello world");
        editor.select(0, 6, 11);
        editor.apply(Command::Bold);
        assert_eq!(editor.html(), "<p>hello <strong>world</strong></p>");
        editor.apply(Command::Bold);
        assert_eq!(editor.html(), "<p>hello world</p>");
    }

    #[test]
    fn typing_after_bold_text_continues_the_mark() {
        let (mut editor, _) = typed("ab");
        editor.select(0, 0, 2);
        editor.apply(Command::Bold);
        editor.select(0, 2, 2);
        editor.insert_text("c");
        assert_eq!(editor.html(), "<p><strong>abc</strong></p>");
    }

    #[test]
    fn lists_group_consecutive_items() {
        let (mut editor, _) = typed("one");
        editor.split_block();
        editor.insert_text("two");
        editor.select(0, 0, 0);
        editor.apply(Command::BulletList);
        editor.select(1, 0, 0);
        editor.apply(Command::BulletList);
        assert_eq!(editor.html(), "<ul><li>one</li><li>two</li></ul>");

        editor.apply(Command::OrderedList);
        assert_eq!(editor.html(), "<ul><li>one</li></ul><ol><li>two</li></ol>");
    }

    #[test]
    fn blockquote_toggles_back_to_paragraph() {
        let (mut editor, _) = typed("quote");
        editor.apply(Command::Blockquote);
        assert_eq!(editor.html(), "<blockquote><p>quote</p></blockquote>");
        editor.apply(Command::Blockquote);
        assert_eq!(editor.html(), "<p>quote</p>");
    }

    #[test]
    fn link_and_image_are_escaped() {
        let (mut editor, _) = typed("a<b");
        editor.select(0, 0, 3);
        editor.apply(Command::Link("https://x.test/?q=\"1\"&r=2".into()));
        editor.select(0, 3, 3);
        editor.apply(Command::Image("/uploads/p.png".into()));
        editor.insert_break();
        assert_eq!(
            editor.html(),
            "<p><a href=\"https://x.test/?q=&quot;1&quot;&amp;r=2\">a&lt;b</a><img src=\"/uploads/p.png\"><br></p>"
        );
    }

    #[test]
    fn undo_and_redo_restore_snapshots() {
        let (mut editor, seen) = typed("draft");
        editor.select(0, 0, 5);
        editor.apply(Command::Italic);
        let formatted = editor.html();

        assert!(editor.apply(Command::Undo));
        assert_eq!(editor.html(), "<p>draft</p>");
        assert!(editor.apply(Command::Undo));
        assert_eq!(editor.html(), "<p></p>");
        assert!(!editor.apply(Command::Undo));

        assert!(editor.apply(Command::Redo));
        assert!(editor.apply(Command::Redo));
        assert_eq!(editor.html(), formatted);
        assert!(!editor.apply(Command::Redo));
        assert_eq!(seen.lock().expect("lock").last(), Some(&formatted));
    }

    #[test]
    fn new_edit_discards_redo_history() {
        let (mut editor, _) = typed("one");
        editor.apply(Command::Undo);
        editor.select(0, 0, 0);
        editor.insert_text("two");
        assert!(!editor.apply(Command::Redo));
        assert_eq!(editor.html(), "<p>two</p>");
    }

    #[test]
    fn toolbar_names_parse_into_commands() {
        assert_eq!(Command::parse("bold", None), Some(Command::Bold));
        assert_eq!(
            Command::parse("link", Some(" https://a.test ")),
            Some(Command::Link("https://a.test".into()))
        );
        assert_eq!(Command::parse("image", Some("  ")), None);
        assert_eq!(Command::parse("strike", None), None);
    }
}
