//! Syntax tree model and the token-grouping builder
//!
//! The extraction engine walks a small typed tree rather than raw tokens.
//! `ScriptBuilder` produces that tree from a `sqlparser` token stream by
//! grouping tokens into statements and tagging the names it saw in table or
//! target position. Any front-end that produces `SyntaxNode`s can drive the
//! engine; this builder is the default one.

use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Token, TokenWithSpan, Word};

/// Node categories the extraction engine understands
///
/// A finite enumeration; the walker carries an explicit default arm that
/// recurses without side effect, so front-ends may attach extra structure
/// under `Other` nodes without breaking extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Root of a parsed script
    Script,

    /// `CREATE [OR ALTER] PROCEDURE ...`; first `ObjectReference` child is the name
    ProcedureDefinition,

    /// `CREATE [OR ALTER] FUNCTION ...`; first `ObjectReference` child is the name
    FunctionDefinition,

    /// Direct invocation (`EXEC`/`EXECUTE`/`CALL`) of a named routine
    Call,

    /// Dynamic SQL execution; the executed string is not analyzed
    DynamicSql,

    /// `SELECT`/`WITH` statement
    Select,

    /// `INSERT` statement
    Insert,

    /// `UPDATE` (or `MERGE`) statement
    Update,

    /// `DELETE` statement
    Delete,

    /// `CREATE TABLE` statement; first `ObjectReference` child is the target
    CreateTable,

    /// A name the builder saw in table or target position
    ObjectReference,

    /// Any other identifier-bearing token run inside a statement
    Term,

    /// A statement or token group with no dependency contribution
    Other,
}

/// One node of the syntax tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    /// Node category
    pub kind: NodeKind,

    /// Literal source text of the node (whitespace collapsed)
    pub text: String,

    /// 1-based line number where the node starts
    pub line: u64,

    /// Child nodes in document order
    pub children: Vec<SyntaxNode>,
}

impl SyntaxNode {
    /// Create a leaf node
    pub fn new(kind: NodeKind, text: impl Into<String>, line: u64) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
            children: Vec::new(),
        }
    }

    /// Create a node with children
    pub fn with_children(
        kind: NodeKind,
        text: impl Into<String>,
        line: u64,
        children: Vec<SyntaxNode>,
    ) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
            children,
        }
    }

    /// First direct child tagged as an object reference, if any
    pub fn object_reference(&self) -> Option<&SyntaxNode> {
        self.children
            .iter()
            .find(|c| c.kind == NodeKind::ObjectReference)
    }
}

/// Statement flavor, used for boundary decisions while grouping tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flavor {
    Select,
    Insert,
    Update,
    Delete,
    Merge,
    Other,
}

impl Flavor {
    fn node_kind(self) -> NodeKind {
        match self {
            Self::Select => NodeKind::Select,
            Self::Insert => NodeKind::Insert,
            Self::Update | Self::Merge => NodeKind::Update,
            Self::Delete => NodeKind::Delete,
            Self::Other => NodeKind::Other,
        }
    }
}

/// Keywords that open a new statement when seen at parenthesis depth zero
const STATEMENT_STARTERS: &[&str] = &[
    "SELECT", "INSERT", "UPDATE", "DELETE", "MERGE", "CREATE", "DROP", "ALTER", "TRUNCATE",
    "DECLARE", "SET", "IF", "WHILE", "RETURN", "BEGIN", "END", "EXEC", "EXECUTE", "CALL",
    "COMMIT", "ROLLBACK", "OPEN", "FETCH", "CLOSE", "PRINT", "RAISERROR", "GO", "USE", "GRANT",
    "REVOKE",
];

/// Groups a located token stream into a `SyntaxNode` tree
///
/// Never fails: unrecognized shapes degrade to `Other` nodes and the builder
/// keeps scanning. Partial trees beat aborted runs.
pub struct ScriptBuilder {
    tokens: Vec<TokenWithSpan>,
    pos: usize,
}

impl ScriptBuilder {
    /// Create a builder over a located token stream
    pub fn new(tokens: Vec<TokenWithSpan>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Consume the builder and produce the script root
    pub fn build(mut self) -> SyntaxNode {
        let children = self.parse_statements(false);
        SyntaxNode::with_children(NodeKind::Script, String::new(), 1, children)
    }

    // ---- statement loop ----

    fn parse_statements(&mut self, in_body: bool) -> Vec<SyntaxNode> {
        let mut nodes = Vec::new();
        let mut block_depth: u32 = 0;

        loop {
            self.skip_trivia();
            if self.is_at_end() {
                break;
            }

            if self.peek_keyword(Keyword::BEGIN) && !self.begin_is_transaction() {
                block_depth += 1;
                self.advance();
                continue;
            }

            if self.peek_keyword(Keyword::END) {
                if block_depth > 0 {
                    block_depth -= 1;
                    self.advance();
                    continue;
                }
                if in_body {
                    break;
                }
                // stray END at top level; tolerate and keep scanning
                self.advance();
                continue;
            }

            if self.peek_word_ci("GO") {
                if in_body {
                    break;
                }
                self.advance();
                continue;
            }

            if in_body && self.upcoming_definition() {
                // a following routine definition ends an unterminated body
                break;
            }

            if let Some(node) = self.parse_statement() {
                nodes.push(node);
            }
        }

        nodes
    }

    fn parse_statement(&mut self) -> Option<SyntaxNode> {
        let word = match self.current_word() {
            Some(w) => w.clone(),
            None => {
                // stray punctuation between statements
                self.advance();
                return None;
            }
        };

        match word.keyword {
            Keyword::CREATE | Keyword::ALTER => Some(self.parse_create()),
            Keyword::SELECT | Keyword::WITH => Some(self.parse_dml(Flavor::Select)),
            Keyword::INSERT => Some(self.parse_dml(Flavor::Insert)),
            Keyword::UPDATE => Some(self.parse_dml(Flavor::Update)),
            Keyword::MERGE => Some(self.parse_dml(Flavor::Merge)),
            Keyword::DELETE => Some(self.parse_dml(Flavor::Delete)),
            Keyword::EXECUTE | Keyword::CALL => Some(self.parse_execute()),
            _ if word.value.eq_ignore_ascii_case("EXEC") => Some(self.parse_execute()),
            _ => Some(self.parse_other()),
        }
    }

    // ---- definitions and DDL ----

    fn parse_create(&mut self) -> SyntaxNode {
        let start = self.pos;
        let line = self.current_line();
        let is_alter = self.peek_keyword(Keyword::ALTER);
        self.advance(); // CREATE or ALTER
        self.skip_trivia();

        // CREATE OR ALTER / CREATE OR REPLACE
        if self.peek_keyword(Keyword::OR) {
            self.advance();
            self.skip_trivia();
            self.advance(); // ALTER or REPLACE
            self.skip_trivia();
        }

        if self.peek_keyword(Keyword::PROCEDURE) || self.peek_word_ci("PROC") {
            self.advance();
            return self.parse_definition(NodeKind::ProcedureDefinition, start, line);
        }

        if self.peek_keyword(Keyword::FUNCTION) {
            self.advance();
            return self.parse_definition(NodeKind::FunctionDefinition, start, line);
        }

        if self.peek_keyword(Keyword::TABLE) && !is_alter {
            self.advance();
            return self.parse_create_table(start, line);
        }

        // ALTER TABLE / CREATE VIEW / INDEX / anything else: no dependency
        // contribution
        self.consume_until_boundary(Flavor::Other);
        SyntaxNode::new(NodeKind::Other, self.render(start), line)
    }

    fn parse_definition(&mut self, kind: NodeKind, start: usize, line: u64) -> SyntaxNode {
        let mut children = Vec::new();

        self.skip_trivia();
        if let Some((name, name_line)) = self.read_compound_name() {
            children.push(SyntaxNode::new(NodeKind::ObjectReference, name, name_line));
        }
        let header_end = self.pos;

        // skip the parameter list and any RETURNS clause up to the body
        let mut paren_depth: u32 = 0;
        let mut saw_begin = false;
        while let Some(token) = self.current_token().cloned() {
            match &token.token {
                Token::LParen => {
                    paren_depth += 1;
                    self.advance();
                }
                Token::RParen => {
                    paren_depth = paren_depth.saturating_sub(1);
                    self.advance();
                }
                Token::Word(w) if paren_depth == 0 => match w.keyword {
                    Keyword::AS | Keyword::IS => {
                        self.advance();
                        break;
                    }
                    Keyword::BEGIN => {
                        saw_begin = true;
                        break;
                    }
                    _ => self.advance(),
                },
                _ => self.advance(),
            }
        }

        if !saw_begin {
            self.skip_trivia();
            if self.peek_keyword(Keyword::BEGIN) && !self.begin_is_transaction() {
                saw_begin = true;
            }
        }
        if saw_begin {
            self.advance(); // BEGIN
        }

        children.extend(self.parse_statements(true));

        if saw_begin {
            self.skip_trivia();
            if self.peek_keyword(Keyword::END) {
                self.advance();
                self.skip_trivia();
                if matches!(self.current_token().map(|t| &t.token), Some(Token::SemiColon)) {
                    self.advance();
                }
            }
        }

        SyntaxNode::with_children(kind, self.render_range(start, header_end), line, children)
    }

    fn parse_create_table(&mut self, start: usize, line: u64) -> SyntaxNode {
        let mut children = Vec::new();

        self.skip_trivia();
        // IF NOT EXISTS
        if self.peek_keyword(Keyword::IF) {
            self.advance();
            self.skip_trivia();
            if self.peek_keyword(Keyword::NOT) {
                self.advance();
                self.skip_trivia();
            }
            if self.peek_keyword(Keyword::EXISTS) {
                self.advance();
            }
        }

        self.skip_trivia();
        if let Some((name, name_line)) = self.read_compound_name() {
            children.push(SyntaxNode::new(NodeKind::ObjectReference, name, name_line));
        }

        self.consume_until_boundary(Flavor::Other);
        SyntaxNode::with_children(NodeKind::CreateTable, self.render(start), line, children)
    }

    // ---- EXEC / EXECUTE / CALL ----

    fn parse_execute(&mut self) -> SyntaxNode {
        let start = self.pos;
        let line = self.current_line();
        self.advance(); // EXEC / EXECUTE / CALL
        self.skip_trivia();

        // EXECUTE IMMEDIATE <expr>, EXEC(<string>), EXEC sp_executesql:
        // dynamic SQL, contents not analyzed
        let dynamic = self.peek_word_ci("IMMEDIATE")
            || self.peek_word_ci("sp_executesql")
            || matches!(self.current_token().map(|t| &t.token), Some(Token::LParen));

        if dynamic {
            self.consume_until_boundary(Flavor::Other);
            return SyntaxNode::new(NodeKind::DynamicSql, self.render(start), line);
        }

        // EXEC @ret = proc is a direct call; EXEC @name alone executes a
        // routine named at runtime
        let starts_with_variable =
            matches!(self.current_word(), Some(w) if w.value.starts_with('@'));
        if starts_with_variable {
            self.advance();
            self.skip_trivia();
            if matches!(self.current_token().map(|t| &t.token), Some(Token::Eq)) {
                self.advance();
                self.skip_trivia();
            } else {
                self.consume_until_boundary(Flavor::Other);
                return SyntaxNode::new(NodeKind::DynamicSql, self.render(start), line);
            }
        }

        match self.read_compound_name() {
            Some((name, name_line)) => {
                let callee = SyntaxNode::new(NodeKind::ObjectReference, name, name_line);
                self.consume_until_boundary(Flavor::Other);
                SyntaxNode::with_children(NodeKind::Call, self.render(start), line, vec![callee])
            }
            None => {
                self.consume_until_boundary(Flavor::Other);
                SyntaxNode::new(NodeKind::Other, self.render(start), line)
            }
        }
    }

    // ---- DML statements ----

    fn parse_dml(&mut self, flavor: Flavor) -> SyntaxNode {
        let start = self.pos;
        let line = self.current_line();
        self.advance(); // SELECT / WITH / INSERT / UPDATE / MERGE / DELETE

        let mut children = Vec::new();
        let mut paren_depth: u32 = 0;
        let mut case_depth: u32 = 0;
        // INSERT, UPDATE, DELETE and MERGE name their target directly
        let mut expect_object = !matches!(flavor, Flavor::Select);
        let mut in_from_list = false;

        while let Some(token) = self.current_token().cloned() {
            match &token.token {
                Token::Whitespace(_) => self.advance(),
                Token::LParen => {
                    paren_depth += 1;
                    self.advance();
                }
                Token::RParen => {
                    paren_depth = paren_depth.saturating_sub(1);
                    self.advance();
                }
                Token::SemiColon => {
                    if paren_depth == 0 {
                        self.advance();
                        break;
                    }
                    self.advance();
                }
                Token::Comma => {
                    if paren_depth == 0 && in_from_list {
                        expect_object = true;
                    }
                    self.advance();
                }
                Token::Word(w) => {
                    // CASE expressions close with END; pair them up so the
                    // statement's own boundary is not mistaken
                    if w.keyword == Keyword::CASE {
                        case_depth += 1;
                        self.advance();
                        continue;
                    }
                    if w.keyword == Keyword::END && case_depth > 0 {
                        case_depth -= 1;
                        self.advance();
                        continue;
                    }
                    if paren_depth == 0 && terminates(flavor, w) {
                        break;
                    }
                    if matches!(w.keyword, Keyword::FROM | Keyword::JOIN | Keyword::INTO)
                        || w.value.eq_ignore_ascii_case("USING")
                    {
                        expect_object = true;
                        in_from_list = w.keyword == Keyword::FROM;
                        self.advance();
                    } else if is_clause_boundary(w) {
                        expect_object = false;
                        in_from_list = false;
                        self.advance();
                    } else if is_noise_keyword(w) {
                        self.advance();
                    } else {
                        let name_start = self.pos;
                        let Some((name, name_line)) = self.read_compound_name() else {
                            self.advance();
                            continue;
                        };

                        if expect_object && !name.starts_with('@') {
                            children.push(SyntaxNode::new(
                                NodeKind::ObjectReference,
                                name,
                                name_line,
                            ));
                        } else {
                            // a name directly followed by parentheses is a
                            // call or expression; absorb the argument list so
                            // the heuristic can exclude it
                            if matches!(
                                self.current_token().map(|t| &t.token),
                                Some(Token::LParen)
                            ) {
                                self.consume_balanced_parens();
                                children.push(SyntaxNode::new(
                                    NodeKind::Term,
                                    self.render(name_start),
                                    name_line,
                                ));
                            } else {
                                children.push(SyntaxNode::new(NodeKind::Term, name, name_line));
                            }
                        }
                        expect_object = false;
                    }
                }
                _ => self.advance(),
            }
        }

        SyntaxNode::with_children(flavor.node_kind(), self.render(start), line, children)
    }

    fn parse_other(&mut self) -> SyntaxNode {
        let start = self.pos;
        let line = self.current_line();
        self.advance();
        self.consume_until_boundary(Flavor::Other);
        SyntaxNode::new(NodeKind::Other, self.render(start), line)
    }

    // ---- token plumbing ----

    fn consume_until_boundary(&mut self, flavor: Flavor) {
        let mut paren_depth: u32 = 0;
        let mut case_depth: u32 = 0;

        while let Some(token) = self.current_token().cloned() {
            match &token.token {
                Token::LParen => {
                    paren_depth += 1;
                    self.advance();
                }
                Token::RParen => {
                    paren_depth = paren_depth.saturating_sub(1);
                    self.advance();
                }
                Token::SemiColon => {
                    if paren_depth == 0 {
                        self.advance();
                        return;
                    }
                    self.advance();
                }
                Token::Word(w) => {
                    if w.keyword == Keyword::CASE {
                        case_depth += 1;
                        self.advance();
                        continue;
                    }
                    if w.keyword == Keyword::END && case_depth > 0 {
                        case_depth -= 1;
                        self.advance();
                        continue;
                    }
                    if paren_depth == 0 && terminates(flavor, w) {
                        return;
                    }
                    self.advance();
                }
                _ => self.advance(),
            }
        }
    }

    fn consume_balanced_parens(&mut self) {
        let mut depth: u32 = 0;

        while let Some(token) = self.current_token().cloned() {
            match &token.token {
                Token::LParen => {
                    depth += 1;
                    self.advance();
                }
                Token::RParen => {
                    depth = depth.saturating_sub(1);
                    self.advance();
                    if depth == 0 {
                        return;
                    }
                }
                _ => self.advance(),
            }
        }
    }

    /// Read a possibly dotted, possibly quoted name: `a`, `a.b`, `[a].[b]`, `a.b.c`
    ///
    /// Returns the joined unquoted text and its starting line, or `None` when
    /// the current token cannot start a name.
    fn read_compound_name(&mut self) -> Option<(String, u64)> {
        self.skip_trivia();
        let word = self.current_word()?;
        if is_structural_keyword(word) {
            return None;
        }

        let line = self.current_line();
        let mut parts = vec![word.value.clone()];
        self.advance();

        loop {
            let dot_pos = self.pos;
            self.skip_trivia();
            if !matches!(self.current_token().map(|t| &t.token), Some(Token::Period)) {
                self.pos = dot_pos;
                break;
            }
            self.advance();
            self.skip_trivia();

            let part = self
                .current_word()
                .filter(|w| !is_structural_keyword(w))
                .map(|w| w.value.clone());
            match part {
                Some(value) => {
                    parts.push(value);
                    self.advance();
                }
                None => break,
            }
        }

        Some((parts.join("."), line))
    }

    fn begin_is_transaction(&self) -> bool {
        let mut i = self.pos + 1;
        while i < self.tokens.len() {
            match &self.tokens[i].token {
                Token::Whitespace(_) => i += 1,
                Token::Word(w) => {
                    return w.value.eq_ignore_ascii_case("TRAN")
                        || w.value.eq_ignore_ascii_case("TRANSACTION")
                }
                _ => return false,
            }
        }
        false
    }

    fn upcoming_definition(&self) -> bool {
        let mut words: Vec<String> = Vec::new();
        let mut i = self.pos;
        while i < self.tokens.len() && words.len() < 4 {
            match &self.tokens[i].token {
                Token::Whitespace(_) => {}
                Token::Word(w) => words.push(w.value.to_ascii_uppercase()),
                _ => break,
            }
            i += 1;
        }

        let mut iter = words.iter();
        match iter.next().map(String::as_str) {
            Some("CREATE") | Some("ALTER") => {}
            _ => return false,
        }

        let mut next = iter.next();
        if next.map(String::as_str) == Some("OR") {
            iter.next(); // ALTER or REPLACE
            next = iter.next();
        }

        matches!(
            next.map(String::as_str),
            Some("PROCEDURE") | Some("PROC") | Some("FUNCTION")
        )
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
            || matches!(self.tokens[self.pos].token, Token::EOF)
    }

    fn current_token(&self) -> Option<&TokenWithSpan> {
        match self.tokens.get(self.pos) {
            Some(t) if !matches!(t.token, Token::EOF) => Some(t),
            _ => None,
        }
    }

    fn current_word(&self) -> Option<&Word> {
        match self.current_token().map(|t| &t.token) {
            Some(Token::Word(w)) => Some(w),
            _ => None,
        }
    }

    fn current_line(&self) -> u64 {
        self.tokens
            .get(self.pos)
            .map(|t| t.span.start.line)
            .unwrap_or(1)
    }

    fn peek_keyword(&self, keyword: Keyword) -> bool {
        matches!(self.current_word(), Some(w) if w.keyword == keyword)
    }

    fn peek_word_ci(&self, text: &str) -> bool {
        matches!(self.current_word(), Some(w) if w.value.eq_ignore_ascii_case(text))
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn skip_trivia(&mut self) {
        while matches!(
            self.tokens.get(self.pos).map(|t| &t.token),
            Some(Token::Whitespace(_))
        ) {
            self.pos += 1;
        }
    }

    fn render(&self, start: usize) -> String {
        self.render_range(start, self.pos)
    }

    fn render_range(&self, start: usize, end: usize) -> String {
        render_tokens(&self.tokens[start.min(self.tokens.len())..end.min(self.tokens.len())])
    }
}

/// Render a token slice back to readable text, collapsing whitespace runs
fn render_tokens(tokens: &[TokenWithSpan]) -> String {
    let mut out = String::new();
    let mut glue_next = false;

    for token in tokens {
        match &token.token {
            Token::Whitespace(_) | Token::EOF => {}
            Token::Period => {
                while out.ends_with(' ') {
                    out.pop();
                }
                out.push('.');
                glue_next = true;
            }
            other => {
                let tight = matches!(other, Token::Comma | Token::SemiColon | Token::RParen);
                if tight {
                    while out.ends_with(' ') {
                        out.pop();
                    }
                } else if !out.is_empty() && !glue_next {
                    out.push(' ');
                }
                out.push_str(&other.to_string());
                glue_next = false;
            }
        }
    }

    out
}

fn terminates(flavor: Flavor, word: &Word) -> bool {
    let upper = word.value.to_ascii_uppercase();
    if !STATEMENT_STARTERS.contains(&upper.as_str()) {
        return false;
    }

    // clauses that legally embed another statement keyword stay inside
    let exempt: &[&str] = match flavor {
        Flavor::Select => &["SELECT"],
        Flavor::Insert => &["SELECT"],
        Flavor::Update => &["SET"],
        Flavor::Delete => &[],
        Flavor::Merge => &["SET", "SELECT", "INSERT", "UPDATE", "DELETE"],
        Flavor::Other => &[],
    };

    !exempt.contains(&upper.as_str())
}

fn is_clause_boundary(word: &Word) -> bool {
    matches!(
        word.keyword,
        Keyword::WHERE
            | Keyword::GROUP
            | Keyword::ORDER
            | Keyword::HAVING
            | Keyword::ON
            | Keyword::WHEN
            | Keyword::SET
            | Keyword::VALUES
            | Keyword::UNION
            | Keyword::EXCEPT
            | Keyword::INTERSECT
            | Keyword::SELECT
            | Keyword::INSERT
            | Keyword::UPDATE
            | Keyword::DELETE
    )
}

fn is_noise_keyword(word: &Word) -> bool {
    matches!(
        word.keyword,
        Keyword::AS
            | Keyword::AND
            | Keyword::OR
            | Keyword::NOT
            | Keyword::IN
            | Keyword::IS
            | Keyword::NULL
            | Keyword::LIKE
            | Keyword::BETWEEN
            | Keyword::EXISTS
            | Keyword::THEN
            | Keyword::ELSE
            | Keyword::ASC
            | Keyword::DESC
            | Keyword::TOP
            | Keyword::DISTINCT
            | Keyword::ALL
            | Keyword::BY
            | Keyword::INNER
            | Keyword::OUTER
            | Keyword::LEFT
            | Keyword::RIGHT
            | Keyword::FULL
            | Keyword::CROSS
            | Keyword::WITH
    )
}

fn is_structural_keyword(word: &Word) -> bool {
    matches!(
        word.keyword,
        Keyword::AS
            | Keyword::IS
            | Keyword::BEGIN
            | Keyword::END
            | Keyword::SELECT
            | Keyword::FROM
            | Keyword::WHERE
            | Keyword::INTO
            | Keyword::SET
            | Keyword::VALUES
            | Keyword::TABLE
            | Keyword::PROCEDURE
            | Keyword::FUNCTION
            | Keyword::ON
            | Keyword::WHEN
    )
}
