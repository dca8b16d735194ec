use super::*;
use proptest::prelude::*;

fn ids(raw: &[i64]) -> Vec<ItemId> {
    raw.iter().copied().map(ItemId).collect()
}

fn item(id: i64, sort_order: i64) -> Item {
    Item {
        id: ItemId(id),
        name: format!("item-{id}"),
        quantity: id,
        price: 1.0,
        date: "2024-01-01T00:00:00Z".parse().expect("timestamp"),
        sort_order,
    }
}

#[test]
fn moving_first_onto_last_shifts_the_rest_up() {
    let seq = ids(&[1, 2, 3]);
    assert_eq!(move_by_ids(&seq, ItemId(1), ItemId(3)), ids(&[2, 3, 1]));
}

#[test]
fn moving_last_onto_first_shifts_the_rest_down() {
    let seq = ids(&[1, 2, 3, 4]);
    assert_eq!(move_by_ids(&seq, ItemId(4), ItemId(2)), ids(&[1, 4, 2, 3]));
}

#[test]
fn absent_ids_leave_sequence_unchanged() {
    let seq = ids(&[1, 2, 3]);
    assert_eq!(move_by_ids(&seq, ItemId(9), ItemId(1)), seq);
    assert_eq!(move_by_ids(&seq, ItemId(1), ItemId(9)), seq);
}

#[test]
fn store_move_is_pure() {
    let mut store = OrderedCollectionStore::new();
    store.load(vec![item(1, 0), item(2, 1), item(3, 2)]);

    let candidate = store.move_by_ids(ItemId(3), ItemId(1));
    assert_eq!(
        candidate.iter().map(|i| i.id).collect::<Vec<_>>(),
        ids(&[3, 1, 2])
    );
    assert_eq!(store.ids(), ids(&[1, 2, 3]));
    assert!(store.is_noop_move(ItemId(2), ItemId(2)));
    assert!(store.is_noop_move(ItemId(2), ItemId(42)));
    assert!(!store.is_noop_move(ItemId(2), ItemId(3)));
}

#[test]
fn reconcile_keeps_local_order_and_appends_new_items() {
    let mut store = OrderedCollectionStore::new();
    store.load(vec![item(3, 2), item(1, 0), item(2, 1)]);

    let mut renamed = item(1, 0);
    renamed.name = "renamed".into();
    store.reconcile(vec![renamed, item(3, 2), item(4, 3)]);

    assert_eq!(store.ids(), ids(&[3, 1, 4]));
    assert_eq!(store.get(ItemId(1)).map(|i| i.name.as_str()), Some("renamed"));
    assert!(!store.contains(ItemId(2)));
}

proptest! {
    #[test]
    fn self_move_is_identity(raw in prop::collection::vec(0i64..20, 0..12), x in 0i64..25) {
        let seq = ids(&raw);
        prop_assert_eq!(move_by_ids(&seq, ItemId(x), ItemId(x)), seq);
    }

    #[test]
    fn move_preserves_length_and_membership(
        raw in prop::collection::vec(0i64..20, 0..12),
        source in 0i64..25,
        target in 0i64..25,
    ) {
        let seq = ids(&raw);
        let moved = move_by_ids(&seq, ItemId(source), ItemId(target));
        prop_assert_eq!(moved.len(), seq.len());

        let mut before = seq.clone();
        let mut after = moved.clone();
        before.sort();
        after.sort();
        prop_assert_eq!(before, after);
    }

    #[test]
    fn moved_element_lands_on_target_slot(
        len in 2usize..12,
        from in 0usize..12,
        to in 0usize..12,
    ) {
        let from = from % len;
        let to = to % len;
        prop_assume!(from != to);
        let seq: Vec<ItemId> = (0..len as i64).map(ItemId).collect();

        let moved = move_by_ids(&seq, seq[from], seq[to]);
        prop_assert_eq!(moved[to], seq[from]);

        let mut rest_before = seq.clone();
        rest_before.remove(from);
        let mut rest_after = moved.clone();
        rest_after.remove(to);
        prop_assert_eq!(rest_before, rest_after);
    }
}
