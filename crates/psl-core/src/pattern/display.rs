use std::fmt;

use super::{Pattern, PatternId, PatternKind};

/// PSL text rendering of a sub-pattern
///
/// Used as the register label in DOT output and log lines.
pub struct PatternDisplay<'a> {
    pattern: &'a Pattern,
    id: PatternId,
}

impl<'a> PatternDisplay<'a> {
    pub(super) fn new(pattern: &'a Pattern, id: PatternId) -> Self {
        Self { pattern, id }
    }

    fn child(&self, id: PatternId) -> PatternDisplay<'a> {
        PatternDisplay::new(self.pattern, id)
    }

    fn list(&self, f: &mut fmt::Formatter<'_>, items: &[PatternId], lax: bool) -> fmt::Result {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", self.child(*item))?;
        }
        if lax {
            if !items.is_empty() {
                f.write_str(", ")?;
            }
            f.write_str("...")?;
        }
        Ok(())
    }
}

impl fmt::Display for PatternDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Ok(kind) = self.pattern.kind(self.id) else {
            return write!(f, "<?{}>", self.id.raw());
        };
        match kind {
            PatternKind::Value(None) => f.write_str("*"),
            PatternKind::Value(Some(literal)) => write!(f, "{}", literal),
            PatternKind::Type {
                name,
                attrs,
                subs,
                strict,
                kind_of,
            } => {
                f.write_str(name)?;
                if *kind_of {
                    f.write_str("?")?;
                }
                if attrs.is_none() && subs.is_none() {
                    return Ok(());
                }
                f.write_str("(")?;
                let items: Vec<PatternId> = subs
                    .iter()
                    .copied()
                    .chain(attrs.iter().flatten().copied())
                    .collect();
                self.list(f, &items, !strict)?;
                f.write_str(")")
            }
            PatternKind::Attr { name, inner } => write!(
                f,
                ".{}={}",
                name.as_deref().unwrap_or("*"),
                self.child(*inner)
            ),
            PatternKind::Indice { index, inner } => match index {
                Some(index) => write!(f, "{}: {}", index, self.child(*inner)),
                None => write!(f, "*: {}", self.child(*inner)),
            },
            PatternKind::Key { key, inner } => match key {
                Some(key) => write!(f, "'{}': {}", key, self.child(*inner)),
                None => write!(f, "*: {}", self.child(*inner)),
            },
            PatternKind::List { items, strict } => {
                f.write_str("[")?;
                self.list(f, items, !strict)?;
                f.write_str("]")
            }
            PatternKind::Dict { items, strict } => {
                f.write_str("{")?;
                self.list(f, items, !strict)?;
                f.write_str("}")
            }
            PatternKind::Ancestor {
                left,
                right,
                depth,
                is_min,
            } => {
                let op = match (*depth, *is_min) {
                    (1, false) => "/".to_string(),
                    (d, false) => format!("/{}", d),
                    (d, true) => format!("/+{}", d),
                };
                write!(f, "{} {} {}", self.child(*left), op, self.child(*right))
            }
            PatternKind::Sibling { items } => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ~~ ")?;
                    }
                    write!(f, "{}", self.child(*item))?;
                }
                Ok(())
            }
            PatternKind::Capture { name, inner, pair } => {
                let arrow = if *pair { "->>" } else { "->" };
                write!(f, "{}{}{}", self.child(*inner), arrow, name)
            }
            PatternKind::NamedEvent { name, inner } => {
                write!(f, "{} => {};", self.child(*inner), name)
            }
            PatternKind::Precondition { inner, expr, clean } => {
                let op = if *clean { "&&" } else { "!!" };
                write!(f, "{} {} ({})", self.child(*inner), op, expr)
            }
            PatternKind::Hook { name, inner } => {
                write!(f, "{} => #{};", self.child(*inner), name)
            }
            PatternKind::Block { statements } => {
                f.write_str("{\n")?;
                for statement in statements {
                    writeln!(f, "    {}", self.child(*statement))?;
                }
                f.write_str("}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::pattern::{EventExpr, PatternBuilder, TypeOptions};

    #[test]
    fn test_type_with_attrs() {
        let mut b = PatternBuilder::new();
        let one = b.value(1);
        let x = b.attr(Some("x"), one).unwrap();
        let foo = b
            .type_match("Foo", Some(vec![x]), None, TypeOptions::default())
            .unwrap();
        let hooked = b.hook("on_foo", foo).unwrap();
        let pattern = b.finish(hooked).unwrap();

        assert_eq!(pattern.to_string(), "Foo(.x=1) => #on_foo;");
    }

    #[test]
    fn test_lax_list_and_ancestor() {
        let mut b = PatternBuilder::new();
        let s = b.value("a");
        let i0 = b.indice(Some(0), s).unwrap();
        let list = b.list(vec![i0], false).unwrap();
        let a = b.ty("A").unwrap();
        let rel = b.ancestor(a, list, 2, true).unwrap();
        let pattern = b.finish(rel).unwrap();

        assert_eq!(pattern.to_string(), "A /+2 [0: 'a', ...]");
    }

    #[test]
    fn test_precondition_and_capture() {
        let mut b = PatternBuilder::new();
        let t = b.type_match("B", None, None, TypeOptions::default().with_kind_of()).unwrap();
        let cap = b.capture("b", t).unwrap();
        let pre = b
            .precondition(cap, EventExpr::named("seen"), false)
            .unwrap();
        let pattern = b.finish(pre).unwrap();

        assert_eq!(pattern.to_string(), "B?->b !! (seen)");
    }
}
