//! Stock validation policy.
//!
//! One rule, evaluated twice in the pipeline: advisorily when an item is
//! added to a cart, and authoritatively inside the order assembly
//! transaction. A positive add-time answer is not a reservation; stock only
//! moves at successful assembly.

use crate::models::Article;

/// Whether `quantity` units of `article` can be fulfilled right now.
///
/// Policy: `article.ignore_stock || article.stock >= quantity`.
#[must_use]
pub const fn can_fulfill(article: &Article, quantity: u32) -> bool {
    article.ignore_stock || article.stock >= quantity
}
