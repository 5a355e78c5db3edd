use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    error::Error,
    schema::{CartIngredient, Id},
    store::Store,
};

/// One summed line of a shopping list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

/// Sums amounts per (name, unit), ordered by name then unit.
///
/// Same name under different units stays on separate lines.
pub fn aggregate(lines: impl IntoIterator<Item = CartIngredient>) -> Vec<ShoppingListItem> {
    let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();

    for line in lines {
        *totals
            .entry((line.name, line.measurement_unit))
            .or_insert(0) += line.amount as i64;
    }

    totals
        .into_iter()
        .map(|((name, measurement_unit), amount)| ShoppingListItem {
            name,
            measurement_unit,
            amount,
        })
        .collect()
}

/// Shopping list of everything in `user_id`'s cart. Read only.
pub async fn shopping_list(store: &dyn Store, user_id: Id) -> Result<Vec<ShoppingListItem>, Error> {
    let lines = store.list_cart_ingredients(user_id).await?;
    Ok(aggregate(lines))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(name: &str, unit: &str, amount: i32) -> CartIngredient {
        CartIngredient {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            amount,
        }
    }

    #[test]
    fn empty_cart_is_empty_list() {
        assert!(aggregate(Vec::new()).is_empty());
    }

    #[test]
    fn sums_same_name_and_unit() {
        let items = aggregate(vec![
            line("Sugar", "g", 100),
            line("Flour", "g", 200),
            line("Flour", "g", 300),
        ]);

        assert_eq!(
            items,
            vec![
                ShoppingListItem {
                    name: String::from("Flour"),
                    measurement_unit: String::from("g"),
                    amount: 500,
                },
                ShoppingListItem {
                    name: String::from("Sugar"),
                    measurement_unit: String::from("g"),
                    amount: 100,
                },
            ]
        );
    }

    #[test]
    fn units_are_never_merged() {
        let items = aggregate(vec![line("Milk", "ml", 200), line("Milk", "cup", 1)]);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].measurement_unit, "cup");
        assert_eq!(items[1].measurement_unit, "ml");
    }

    #[test]
    fn totals_do_not_overflow_small_integers() {
        let items = aggregate(vec![line("Rice", "g", 32767), line("Rice", "g", 32767)]);
        assert_eq!(items[0].amount, 65534);
    }
}
