//! PEG IR: rule bodies annotated for emission.
//!
//! Lowering assigns each sub-expression the dense integer id used to name
//! generated variables, computes capture flags top-down, collapses
//! transparent wrappers, and collects the per-rule label lists.

use crate::analyze::Symtab;
use crate::ast::{BaseExpr, Kleene, ModExpr, ModExprList, ModExprOpts, SlashExpr};

#[derive(Debug, Clone)]
pub struct PegIr {
    pub rules: Vec<RuleIr>,
}

#[derive(Debug, Clone)]
pub struct RuleIr {
    pub name: String,
    pub locals: Vec<String>,
    /// Label variables to declare at the top of the parse function,
    /// first-seen order, deduplicated.
    pub labels: Vec<String>,
    /// Variable holding the rule's result (`rule` inside actions).
    pub rule_id: u32,
    /// Variable receiving the body's result.
    pub body_id: u32,
    pub body: IrExpr,
}

#[derive(Debug, Clone)]
pub enum IrExpr {
    Choice(IrChoice),
    Sequence(IrSequence),
    Mod(Box<IrMod>),
    Token(IrToken),
    Rule(IrRule),
    Code(IrCode),
}

/// Ordered alternation with two or more arms (single arms collapse).
#[derive(Debug, Clone)]
pub struct IrChoice {
    pub id: u32,
    pub alts: Vec<IrExpr>,
}

#[derive(Debug, Clone)]
pub struct IrSequence {
    pub id: u32,
    pub items: Vec<IrExpr>,
}

impl IrSequence {
    /// A one-item sequence forwards its item's result (and capture).
    pub fn forwards(&self) -> bool {
        self.items.len() == 1
    }
}

#[derive(Debug, Clone)]
pub struct IrMod {
    pub id: u32,
    /// Loop scratch variable for `+` (match counter home) and `*` (sentinel).
    pub loop_id: Option<u32>,
    /// Result variable of a code error handler.
    pub err_id: Option<u32>,
    pub opts: ModExprOpts,
    pub label: Option<String>,
    pub err: Option<IrErr>,
    /// Whether this expression must produce a real node (label present, or
    /// enclosing context captures and no optional/inverted/repeat).
    pub captures: bool,
    pub inner: IrExpr,
}

#[derive(Debug, Clone)]
pub enum IrErr {
    Message(String),
    Code(IrCode),
}

#[derive(Debug, Clone)]
pub struct IrToken {
    pub name: String,
    pub captures: bool,
}

#[derive(Debug, Clone)]
pub struct IrRule {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct IrCode {
    pub content: String,
    pub line: u32,
}

struct Lowerer {
    next_id: u32,
    labels: Vec<String>,
}

impl Lowerer {
    fn id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// Lowers every rule body in definition order.
pub fn lower(symtab: &Symtab) -> PegIr {
    let mut lowerer = Lowerer {
        next_id: 0,
        labels: Vec::new(),
    };
    let mut rules = Vec::new();

    for rule in &symtab.rules {
        lowerer.labels.clear();
        let rule_id = lowerer.id();
        let body_id = lowerer.id();
        let body = lower_slash(&mut lowerer, &rule.body, true);
        rules.push(RuleIr {
            name: rule.name.text.clone(),
            locals: rule.locals.clone(),
            labels: std::mem::take(&mut lowerer.labels),
            rule_id,
            body_id,
            body,
        });
    }

    PegIr { rules }
}

fn lower_slash(l: &mut Lowerer, expr: &SlashExpr, capture: bool) -> IrExpr {
    if expr.alts.len() == 1 {
        // A one-alternative SlashExpr is transparent.
        return lower_list(l, &expr.alts[0], capture);
    }
    let id = l.id();
    let alts = expr
        .alts
        .iter()
        .map(|alt| lower_list(l, alt, capture))
        .collect();
    IrExpr::Choice(IrChoice { id, alts })
}

fn lower_list(l: &mut Lowerer, list: &ModExprList, capture: bool) -> IrExpr {
    let id = l.id();
    let last = list.exprs.len().saturating_sub(1);
    let items = list
        .exprs
        .iter()
        .enumerate()
        .map(|(i, expr)| lower_mod(l, expr, if i == last { capture } else { false }))
        .collect();
    IrExpr::Sequence(IrSequence { id, items })
}

fn lower_mod(l: &mut Lowerer, expr: &ModExpr, capture: bool) -> IrExpr {
    if expr.is_transparent() {
        return lower_base(l, &expr.base, capture);
    }

    if let Some(label) = &expr.label {
        let name = label.text.clone();
        if name != "rule" && !l.labels.contains(&name) {
            l.labels.push(name);
        }
    }

    let id = l.id();
    let loop_id = (expr.opts.kleene != Kleene::None).then(|| l.id());

    let captures = (capture || expr.label.is_some())
        && !expr.opts.optional
        && !expr.opts.inverted
        && expr.opts.kleene == Kleene::None;

    // Repetition bodies never capture (which iteration would be returned?),
    // and `captures` is already false for them.
    let inner = lower_base(l, &expr.base, captures);

    let err = expr.err.as_ref().map(|err| match err {
        crate::ast::ErrHandler::Message(msg) => IrErr::Message(msg.clone()),
        crate::ast::ErrHandler::Code(code) => IrErr::Code(IrCode {
            content: code.content.clone(),
            line: code.line,
        }),
    });
    let err_id = matches!(err, Some(IrErr::Code(_))).then(|| l.id());

    IrExpr::Mod(Box::new(IrMod {
        id,
        loop_id,
        err_id,
        opts: expr.opts,
        label: expr.label.as_ref().map(|label| label.text.clone()),
        err,
        captures,
        inner,
    }))
}

fn lower_base(l: &mut Lowerer, base: &BaseExpr, capture: bool) -> IrExpr {
    match base {
        BaseExpr::Token(ident) => IrExpr::Token(IrToken {
            name: ident.text.clone(),
            captures: capture,
        }),
        BaseExpr::Rule(ident) => IrExpr::Rule(IrRule {
            name: ident.text.clone(),
        }),
        BaseExpr::Code(code) => IrExpr::Code(IrCode {
            content: code.content.clone(),
            line: code.line,
        }),
        BaseExpr::Parens(inner) => lower_slash(l, inner, capture),
    }
}
