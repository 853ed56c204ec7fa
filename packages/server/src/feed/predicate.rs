use sea_orm::ColumnTrait;
use sea_orm::sea_query::Condition;

use crate::entity::discussion;

/// Discussion columns a feed predicate may constrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Id,
    AuthorId,
}

impl Field {
    fn column(self) -> discussion::Column {
        match self {
            Field::Id => discussion::Column::Id,
            Field::AuthorId => discussion::Column::UserId,
        }
    }
}

/// Filter over discussions, interpreted by the record store.
///
/// Conjunctions are kept flat, so `a.and(b).and(c)` and `a.and(b.and(c))`
/// produce the same value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Eq(Field, i64),
    Lt(Field, i64),
    Gt(Field, i64),
    And(Vec<Predicate>),
}

impl Predicate {
    /// Matches every discussion.
    pub fn all() -> Self {
        Predicate::And(Vec::new())
    }

    pub fn id_less_than(id: i64) -> Self {
        Predicate::Lt(Field::Id, id)
    }

    pub fn id_greater_than(id: i64) -> Self {
        Predicate::Gt(Field::Id, id)
    }

    pub fn author_is(user_id: i64) -> Self {
        Predicate::Eq(Field::AuthorId, user_id)
    }

    pub fn and(self, other: Predicate) -> Self {
        let mut clauses = self.into_clauses();
        clauses.extend(other.into_clauses());
        Predicate::And(clauses)
    }

    fn into_clauses(self) -> Vec<Predicate> {
        match self {
            Predicate::And(clauses) => clauses,
            leaf => vec![leaf],
        }
    }

    /// Translate into a sea-orm condition usable with `.filter(...)`.
    pub fn to_condition(&self) -> Condition {
        match self {
            Predicate::Eq(field, value) => Condition::all().add(field.column().eq(*value)),
            Predicate::Lt(field, value) => Condition::all().add(field.column().lt(*value)),
            Predicate::Gt(field, value) => Condition::all().add(field.column().gt(*value)),
            Predicate::And(clauses) => clauses
                .iter()
                .fold(Condition::all(), |cond, clause| cond.add(clause.to_condition())),
        }
    }
}
