use domain::{CommentFilter, ItemScope, ParentScope};
use sqlx::{QueryBuilder, Sqlite};

pub(crate) const COMMENT_COLUMNS: &str = "id, context_id, component, comment_area, item_id, \
     content, format, user_id, user_modified, pseudonym, time_created, time_modified, \
     reply_to_id, replies, upvotes, custom_data";

/// Appends the WHERE clause for `filter`. Shared by select, count and delete
/// so the three always agree on which rows match.
pub(crate) fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &CommentFilter) {
    qb.push(" WHERE component = ");
    qb.push_bind(filter.component.clone());
    qb.push(" AND comment_area = ");
    qb.push_bind(filter.area.clone());
    push_in(qb, "context_id", &filter.context_ids);

    match &filter.items {
        ItemScope::All => {}
        ItemScope::One(item_id) => {
            qb.push(" AND item_id = ");
            qb.push_bind(*item_id);
        }
        ItemScope::AnyOf(item_ids) => push_in(qb, "item_id", item_ids),
    }

    match filter.parent {
        ParentScope::Any => {}
        ParentScope::TopLevel => {
            qb.push(" AND reply_to_id IS NULL");
        }
        ParentScope::RepliesTo(parent) => {
            qb.push(" AND reply_to_id = ");
            qb.push_bind(parent);
        }
    }

    if let Some(from) = filter.time_from {
        qb.push(" AND time_created >= ");
        qb.push_bind(from.timestamp());
    }
    if let Some(to) = filter.time_to {
        qb.push(" AND time_created <= ");
        qb.push_bind(to.timestamp());
    }
}

/// `AND column IN (...)`; an empty list matches nothing.
pub(crate) fn push_in(qb: &mut QueryBuilder<'_, Sqlite>, column: &str, values: &[i64]) {
    if values.is_empty() {
        qb.push(" AND 0 = 1");
        return;
    }
    qb.push(" AND ");
    qb.push(column);
    qb.push(" IN (");
    let mut separated = qb.separated(", ");
    for value in values {
        separated.push_bind(*value);
    }
    separated.push_unseparated(")");
}
