mod common;

use std::rc::Rc;

use latebind::{enum_begin, get_value, last_exception, reset_last_exception, Context, Error};
use latebind_core::{Cell, ErrorCode, ObjectRef};
use latebind_expando::Expando;

use common::image_process;

fn device(name: &str) -> ObjectRef {
    Expando::new("DeviceInfo")
        .named(name)
        .with_property("Name", name)
        .into_object()
}

fn manager() -> ObjectRef {
    let devices = Expando::collection(
        "DeviceInfos",
        vec![
            Cell::Object(device("Flatbed")),
            Cell::Object(device("Camera")),
        ],
    );
    Expando::new("DeviceManager")
        .with_property("DeviceInfos", devices.into_object())
        .into_object()
}

#[test]
fn test_objects_iterate_in_order() {
    let manager = manager();
    let names: Vec<String> = enum_begin!(&manager, ".DeviceInfos")
        .unwrap()
        .objects()
        .map(|device| {
            let device = device.unwrap();
            latebind::get::<String>(&device, ".Name", &[]).unwrap()
        })
        .collect();
    assert_eq!(names, vec!["Flatbed", "Camera"]);
}

#[test]
fn test_end_of_sequence_is_idempotent() {
    let manager = manager();
    let mut devices = enum_begin!(&manager, ".DeviceInfos").unwrap();
    assert!(devices.next_object().unwrap().is_some());
    assert!(devices.next_object().unwrap().is_some());
    for _ in 0..3 {
        assert!(devices.next_object().unwrap().is_none());
        assert!(devices.next_cell().unwrap().is_none());
    }
}

#[test]
fn test_non_object_element_is_a_type_error() {
    let _guard = common::guard();
    reset_last_exception();
    let list = Expando::collection("List", vec![Cell::I32(1), Cell::Object(device("Camera"))])
        .into_object();

    let mut items = enum_begin!(&list, "").unwrap();
    let err = items.next_object().err().unwrap();
    assert!(matches!(err, Error::Coerce { .. }));
    assert_eq!(err.code(), ErrorCode::TYPE_MISMATCH);
    assert_eq!(last_exception().unwrap().error_function, "enumerate");

    // the cursor moved past the bad element
    assert!(items.next_object().unwrap().is_some());
    assert!(items.next_object().unwrap().is_none());
}

#[test]
fn test_advance_failure_names_the_enumerated_path() {
    let _guard = common::guard();
    let trays = Expando::collection("Trays", vec![Cell::from("A4")]);
    let printer = Expando::new("Printer")
        .with_property("Trays", trays.into_object())
        .into_object();

    let mut ctx = Context::new();
    let mut items = ctx.enum_begin(&printer, ".Trays", &[]).unwrap();
    assert_eq!(items.path(), ".Trays");
    items.next_object().err().unwrap();

    let exc = items.last_exception().unwrap();
    assert_eq!(exc.complete_member, ".Trays");
    assert_eq!(exc.member, "Next");
    assert_eq!(last_exception().as_ref(), Some(exc));
    assert!(ctx.last_exception().is_none());
}

#[test]
fn test_cells_yield_raw_values() {
    let list = Expando::collection("List", vec![Cell::I32(1), Cell::from("two")]).into_object();
    let cells: Vec<Cell> = enum_begin!(&list, ".")
        .unwrap()
        .cells()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(cells, vec![Cell::I32(1), Cell::from("two")]);
}

#[test]
fn test_each_yielded_object_is_released_by_the_loop_body() {
    let item = Rc::new(Expando::new("Item"));
    let obj: ObjectRef = item.clone();
    let list = Expando::collection("List", vec![Cell::Object(obj)]).into_object();
    let baseline = Rc::strong_count(&item);

    for element in enum_begin!(&list, "").unwrap().objects() {
        let element = element.unwrap();
        assert!(Rc::strong_count(&item) > baseline);
        drop(element);
    }
    assert_eq!(Rc::strong_count(&item), baseline);
}

#[test]
fn test_enumerating_through_an_indexed_path() {
    let (_, process) = image_process();
    let mut ctx = Context::new();
    let properties = ctx
        .enum_begin(&process, ".Filters(%d).Properties", &latebind::args![1])
        .unwrap();
    let names: Vec<String> = properties
        .objects()
        .map(|p| p.unwrap().member_name().unwrap_or_default())
        .collect();
    assert_eq!(names, vec!["Quality"]);
}

#[test]
fn test_non_collection_cannot_be_enumerated() {
    let manager = manager();
    let err = enum_begin!(&manager, "").err().unwrap();
    assert_eq!(err.code(), ErrorCode::MEMBER_NOT_FOUND);

    let err = enum_begin!(&manager, ".Missing").err().unwrap();
    assert_eq!(err.code(), ErrorCode::UNKNOWN_NAME);

    let count = get_value!("%d", &manager, ".DeviceInfos.Count").unwrap();
    assert_eq!(count, Cell::I32(2));
}
