use std::cell::RefCell;
use std::rc::Rc;

use editor_session::{NewTab, TabPatch, TabSessionStore};
use pretty_assertions::assert_eq;

#[test]
fn edit_save_close_lifecycle() {
    let store = TabSessionStore::with_welcome("1.0.0");
    let welcome = store.get_active().expect("welcome");

    let id = store
        .add(NewTab::file("notes/todo.txt", "milk"))
        .expect("open");
    assert_eq!(store.get_active().map(|tab| tab.id), Some(id));

    store
        .patch_by_id(id, TabPatch::edit("milk, eggs"))
        .expect("edit");
    let tab = store.get(id).expect("tab");
    assert!(tab.dirty);
    assert!(tab.needs_backup());

    store.patch_by_id(id, TabPatch::saved()).expect("save");
    let tab = store.get(id).expect("tab");
    assert!(!tab.dirty);
    assert!(!tab.needs_backup());

    let closed = store.remove_by_id(id).expect("close");
    assert_eq!(closed.content, "milk, eggs");
    assert_eq!(store.get_active().map(|tab| tab.id), Some(welcome.id));
}

#[test]
fn observers_track_active_tab_through_reorder() {
    let store = TabSessionStore::new();
    let active_orders = Rc::new(RefCell::new(Vec::new()));
    let sink = active_orders.clone();
    let _sub = store.subscribe(move |tabs| {
        if let Some(tab) = tabs.iter().find(|tab| tab.active) {
            sink.borrow_mut().push(tab.order);
        }
    });

    store.add(NewTab::scratch("A")).expect("add");
    store.add(NewTab::scratch("B")).expect("add");
    store.add(NewTab::scratch("C").inactive()).expect("add");
    store.reorder(1, 2).expect("reorder");

    assert_eq!(*active_orders.borrow(), vec![0, 1, 1, 2]);
}

#[test]
fn tabs_serialize_with_their_flags() {
    let store = TabSessionStore::new();
    let id = store
        .add(NewTab::file("a.txt", "body").recovered())
        .expect("add");
    let tab = store.get(id).expect("tab");

    let json = serde_json::to_value(&tab).expect("serialize");
    assert_eq!(json["file_name"], "a.txt");
    assert_eq!(json["dirty"], true);
    assert_eq!(json["backup_synced"], true);
    assert_eq!(json["active"], true);
}
