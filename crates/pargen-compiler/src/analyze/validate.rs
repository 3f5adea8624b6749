//! Cross-reference validation over the assembled symbol table.

use crate::Error;
use crate::ast::{BaseExpr, ModExpr, ModExprList, SlashExpr};

use super::{RESERVED_LABELS, Symtab};

pub(super) fn validate(symtab: &Symtab) -> Result<(), Error> {
    for rule in &symtab.rules {
        validate_slash(symtab, &rule.body)?;
    }
    Ok(())
}

fn validate_slash(symtab: &Symtab, expr: &SlashExpr) -> Result<(), Error> {
    for alt in &expr.alts {
        validate_list(symtab, alt)?;
    }
    Ok(())
}

fn validate_list(symtab: &Symtab, list: &ModExprList) -> Result<(), Error> {
    for expr in &list.exprs {
        validate_mod(symtab, expr)?;
    }
    Ok(())
}

fn validate_mod(symtab: &Symtab, expr: &ModExpr) -> Result<(), Error> {
    match &expr.base {
        BaseExpr::Token(ident) => {
            if !symtab.token_names.contains(ident.as_str()) {
                return Err(Error::UndefinedToken {
                    name: ident.text.clone(),
                });
            }
        }
        BaseExpr::Rule(ident) => {
            if !symtab.has_rule(ident.as_str()) {
                return Err(Error::UndefinedRule {
                    name: ident.text.clone(),
                });
            }
        }
        BaseExpr::Parens(inner) => validate_slash(symtab, inner)?,
        BaseExpr::Code(_) => {}
    }

    if let Some(label) = &expr.label
        && (RESERVED_LABELS.contains(&label.as_str()) || symtab.has_rule(label.as_str()))
    {
        return Err(Error::LabelCollision {
            name: label.text.clone(),
        });
    }

    Ok(())
}
