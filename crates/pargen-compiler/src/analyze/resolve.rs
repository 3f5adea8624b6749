//! `prev`/`next` cross-rule reference rewriting.
//!
//! A rule body may refer to the rule lexically before or after it by the
//! pseudo-names `prev` and `next`. This pass replaces those references with
//! the neighbors' real names. Labels are never rewritten.

use crate::Error;
use crate::ast::{BaseExpr, ModExpr, ModExprList, RuleDef, SlashExpr};

pub(super) fn resolve_prev_next(rules: &mut [RuleDef]) -> Result<(), Error> {
    let names: Vec<String> = rules.iter().map(|r| r.name.text.clone()).collect();

    for name in &names {
        if name == "prev" || name == "next" {
            return Err(Error::ReservedRuleName { name: name.clone() });
        }
    }

    for (i, rule) in rules.iter_mut().enumerate() {
        let prev = (i > 0).then(|| names[i - 1].clone());
        let next = (i + 1 < names.len()).then(|| names[i + 1].clone());
        let rule_name = rule.name.text.clone();
        rewrite_slash(&mut rule.body, &rule_name, prev.as_deref(), next.as_deref())?;
    }

    Ok(())
}

fn rewrite_slash(
    expr: &mut SlashExpr,
    rule: &str,
    prev: Option<&str>,
    next: Option<&str>,
) -> Result<(), Error> {
    for alt in &mut expr.alts {
        rewrite_list(alt, rule, prev, next)?;
    }
    Ok(())
}

fn rewrite_list(
    list: &mut ModExprList,
    rule: &str,
    prev: Option<&str>,
    next: Option<&str>,
) -> Result<(), Error> {
    for expr in &mut list.exprs {
        rewrite_mod(expr, rule, prev, next)?;
    }
    Ok(())
}

fn rewrite_mod(
    expr: &mut ModExpr,
    rule: &str,
    prev: Option<&str>,
    next: Option<&str>,
) -> Result<(), Error> {
    match &mut expr.base {
        BaseExpr::Rule(ident) => {
            let direction = match ident.as_str() {
                "prev" => Some(("previous", prev)),
                "next" => Some(("next", next)),
                _ => None,
            };
            if let Some((direction, replacement)) = direction {
                match replacement {
                    Some(name) => ident.text = name.to_owned(),
                    None => {
                        return Err(Error::NoSuchNeighbor {
                            rule: rule.to_owned(),
                            direction,
                        });
                    }
                }
            }
        }
        BaseExpr::Parens(inner) => rewrite_slash(inner, rule, prev, next)?,
        BaseExpr::Token(_) | BaseExpr::Code(_) => {}
    }
    Ok(())
}
