//! Mutation observation: which edits produce records, how they are batched,
//! and what happens after an observer disconnects.

use dom::{Document, MutationKind, MutationRecord, NodeId, ObserveOptions};

fn head_document() -> (Document, NodeId) {
    let doc = Document::with_skeleton();
    let head = doc.head().expect("skeleton has a head");
    (doc, head)
}

#[test]
fn records_are_batched_until_notify() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (mut doc, head) = head_document();
    let mut observer = doc.observe(head, ObserveOptions::everything()).unwrap();

    let style = doc.create_element("style");
    doc.append_child(head, style).unwrap();
    doc.set_attribute(style, "id", "x").unwrap();
    assert!(observer.try_next_batch().is_none(), "nothing is delivered before the checkpoint");

    assert_eq!(doc.notify_observers(), 1);
    let batch = observer.try_next_batch().expect("one batch");
    assert_eq!(batch.len(), 2);
    assert_eq!(
        batch[0],
        MutationRecord::ChildList {
            target: head,
            added: vec![style],
            removed: Vec::new(),
            previous_sibling: None,
            next_sibling: None,
        }
    );
    assert_eq!(
        batch[1],
        MutationRecord::Attributes {
            target: style,
            name: "id".to_owned(),
            old_value: None,
        }
    );
    assert_eq!(doc.notify_observers(), 0, "queues are emptied by delivery");
}

#[test]
fn subtree_flag_controls_depth() {
    let (mut doc, head) = head_document();
    let style = doc.create_element("style");
    doc.append_child(head, style).unwrap();

    let shallow = ObserveOptions {
        child_list: true,
        ..ObserveOptions::default()
    };
    let mut direct = doc.observe(head, shallow).unwrap();
    let mut deep = doc.observe(head, ObserveOptions::everything()).unwrap();

    let text = doc.create_text(".a{}");
    doc.append_child(style, text).unwrap();
    doc.notify_observers();

    assert!(direct.try_next_batch().is_none());
    let batch = deep.try_next_batch().unwrap();
    assert_eq!(batch[0].target(), style);
    assert_eq!(batch[0].kind(), MutationKind::ChildList);
}

#[test]
fn detached_nodes_are_not_observed() {
    let (mut doc, head) = head_document();
    let mut observer = doc.observe(head, ObserveOptions::everything()).unwrap();

    let style = doc.create_element("style");
    doc.set_attribute(style, "id", "pending").unwrap();
    let text = doc.create_text("p{}");
    doc.append_child(style, text).unwrap();
    assert_eq!(doc.notify_observers(), 0);

    doc.append_child(head, style).unwrap();
    doc.notify_observers();
    assert_eq!(observer.try_next_batch().unwrap().len(), 1);
}

#[test]
fn character_data_old_value_is_opt_in() {
    let (mut doc, head) = head_document();
    let style = doc.create_element("style");
    let text = doc.create_text("old");
    doc.append_child(style, text).unwrap();
    doc.append_child(head, style).unwrap();

    let without_old = ObserveOptions {
        character_data: true,
        subtree: true,
        ..ObserveOptions::default()
    };
    let mut plain = doc.observe(head, without_old).unwrap();
    let mut full = doc.observe(head, ObserveOptions::everything()).unwrap();

    doc.set_text(text, "new").unwrap();
    doc.notify_observers();

    assert_eq!(
        plain.try_next_batch().unwrap(),
        vec![MutationRecord::CharacterData {
            target: text,
            old_value: None
        }]
    );
    assert_eq!(
        full.try_next_batch().unwrap(),
        vec![MutationRecord::CharacterData {
            target: text,
            old_value: Some("old".to_owned())
        }]
    );
}

#[test]
fn set_text_content_replaces_children_in_one_record() {
    let (mut doc, head) = head_document();
    let style = doc.create_element("style");
    let first = doc.create_text("a{}");
    let second = doc.create_text("b{}");
    doc.append_child(style, first).unwrap();
    doc.append_child(style, second).unwrap();
    doc.append_child(head, style).unwrap();
    let mut observer = doc.observe(head, ObserveOptions::everything()).unwrap();

    doc.set_text_content(style, "c{}").unwrap();
    doc.notify_observers();

    let batch = observer.try_next_batch().unwrap();
    assert_eq!(batch.len(), 1);
    let MutationRecord::ChildList {
        target,
        added,
        removed,
        ..
    } = &batch[0]
    else {
        panic!("expected a child list record, got {:?}", batch[0]);
    };
    assert_eq!(*target, style);
    assert_eq!(removed, &vec![first, second]);
    assert_eq!(added.len(), 1);
    assert_eq!(doc.text_content(style), "c{}");
}

#[test]
fn moving_a_node_records_removal_then_insertion() {
    let (mut doc, head) = head_document();
    let body = doc.body().unwrap();
    let style = doc.create_element("style");
    doc.append_child(body, style).unwrap();
    let mut observer = doc.observe(doc.root(), ObserveOptions::everything()).unwrap();

    doc.append_child(head, style).unwrap();
    doc.notify_observers();

    let batch = observer.try_next_batch().unwrap();
    assert_eq!(batch.len(), 2);
    assert!(matches!(&batch[0], MutationRecord::ChildList { target, removed, .. } if *target == body && removed == &vec![style]));
    assert!(matches!(&batch[1], MutationRecord::ChildList { target, added, .. } if *target == head && added == &vec![style]));
}

#[test]
fn disconnect_stops_delivery_but_keeps_buffered_batches() {
    let (mut doc, head) = head_document();
    let mut observer = doc.observe(head, ObserveOptions::everything()).unwrap();

    let first = doc.create_element("style");
    doc.append_child(head, first).unwrap();
    doc.notify_observers();

    observer.disconnect();
    assert!(!observer.is_connected());

    let second = doc.create_element("style");
    doc.append_child(head, second).unwrap();
    assert_eq!(doc.notify_observers(), 0);

    let buffered = observer.try_next_batch().expect("batch sent before disconnect");
    assert_eq!(buffered.len(), 1);
    assert!(observer.try_next_batch().is_none());
}

#[test]
fn take_records_drains_without_delivery() {
    let (mut doc, head) = head_document();
    let mut observer = doc.observe(head, ObserveOptions::everything()).unwrap();
    let style = doc.create_element("style");
    doc.append_child(head, style).unwrap();

    let records = doc.take_records(observer.id());
    assert_eq!(records.len(), 1);
    assert_eq!(doc.notify_observers(), 0);

    doc.disconnect(&mut observer);
    doc.remove_child(head, style).unwrap();
    assert!(doc.take_records(observer.id()).is_empty());
}

#[test]
fn observe_requires_a_record_kind() {
    let (mut doc, head) = head_document();
    let options = ObserveOptions {
        subtree: true,
        ..ObserveOptions::default()
    };
    assert!(doc.observe(head, options).is_err());
}

#[tokio::test]
async fn next_batch_waits_for_delivery() {
    let (mut doc, head) = head_document();
    let mut observer = doc.observe(head, ObserveOptions::everything()).unwrap();
    let style = doc.create_element("style");
    doc.append_child(head, style).unwrap();
    doc.notify_observers();
    drop(doc);

    assert_eq!(observer.next_batch().await.map(|batch| batch.len()), Some(1));
    assert!(observer.next_batch().await.is_none(), "channel ends with the document");
}
