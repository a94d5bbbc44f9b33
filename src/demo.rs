//! Sample diagram and providers used by the demo application.
//!
//! The general provider contributes a "General" group for every element plus a "Details"
//! group for tasks and sequence flows. The input mappings provider adds a sorted, editable
//! list of the task's input mappings and runs after the general one.

use crate::entries::{
    is_edited_when_checked, is_edited_when_set, Entry, FieldKind, FieldValue, Group, ListGroup,
    ListItem, SelectOption,
};
use crate::model::{BusinessObject, BusinessObjectRef, DiagramModel, Element, ElementKind};
use crate::provider::{GroupReducer, PropertiesProvider};
use serde_json::json;
use std::any::Any;
use std::rc::Rc;
use uuid::Uuid;

/// Collection of a task holding its input mappings.
pub const INPUTS_COLLECTION: &str = "inputs";
/// Id of the group every element gets.
pub const GENERAL_GROUP: &str = "general";
/// Id of the type-specific details group.
pub const DETAILS_GROUP: &str = "details";
/// Id of the input mappings list.
pub const INPUT_MAPPINGS_GROUP: &str = "input-mappings";
/// Priority of the input mappings provider; lower than the default, so it runs last.
pub const INPUT_MAPPINGS_PRIORITY: u32 = 500;

/// Fills `model` with a small process: two tasks, a label and a sequence flow.
pub fn populate(model: &DiagramModel) {
    model.set_root(Element::new(
        ElementKind::Root { implicit: false },
        BusinessObject::new("Process_1", "bpmn:Process").with_property("name", json!("Order handling")),
    ));

    let review = Element::shape(
        BusinessObject::new("Task_Review", "bpmn:UserTask")
            .with_property("name", json!("Review order"))
            .with_property("priority", json!("normal")),
    );
    for (id, target, source) in [
        ("Mapping_1", "orderTotal", "${order.total}"),
        ("Mapping_2", "customer", "${order.customer}"),
        ("Mapping_3", "approved", "${false}"),
    ] {
        let mapping = BusinessObject::new(id, "io:InputMapping")
            .with_property("target", json!(target))
            .with_property("source", json!(source))
            .into_ref();
        review
            .business_object
            .borrow_mut()
            .collections
            .entry(INPUTS_COLLECTION.to_string())
            .or_default()
            .push(mapping);
    }
    model.add_element(review.clone());
    model.add_element(Element::label_of(&review));
    model.add_element(Element::shape(
        BusinessObject::new("Task_Ship", "bpmn:ServiceTask").with_property("name", json!("Ship order")),
    ));
    model.add_element(Element::new(
        ElementKind::Connection,
        BusinessObject::new("Flow_1", "bpmn:SequenceFlow"),
    ));
}

/// Provider of the "General" and "Details" groups.
pub fn general_provider() -> Rc<dyn PropertiesProvider> {
    Rc::new(|element: &Element| -> GroupReducer {
        let type_name = element.type_name();
        Box::new(move |mut groups: Vec<Group>| {
            groups.push(
                Group::entries(
                    GENERAL_GROUP,
                    "General",
                    vec![
                        Entry::property("name", "Name", FieldKind::Text, "name")
                            .with_is_edited(is_edited_when_set),
                        Entry::new(
                            "id",
                            "ID",
                            FieldKind::Static,
                            |element: &Element| FieldValue::Text(element.id.clone()),
                            |_, _, _| Ok(()),
                        ),
                        Entry::property(
                            "documentation",
                            "Documentation",
                            FieldKind::TextArea { rows: 3 },
                            "documentation",
                        )
                        .with_is_edited(is_edited_when_set),
                    ],
                )
                .opened(),
            );
            if let Some(details) = details_group(&type_name) {
                groups.push(details);
            }
            groups
        })
    })
}

fn details_group(type_name: &str) -> Option<Group> {
    let entries = if type_name.ends_with("Task") {
        vec![
            Entry::property(
                "priority",
                "Priority",
                FieldKind::Select {
                    options: vec![
                        SelectOption::new("low", "Low"),
                        SelectOption::new("normal", "Normal"),
                        SelectOption::new("high", "High"),
                    ],
                },
                "priority",
            ),
            Entry::property(
                "retries",
                "Retries",
                FieldKind::Number {
                    min: Some(0.0),
                    max: Some(10.0),
                },
                "retries",
            )
            .with_is_edited(is_edited_when_set),
            Entry::property("asyncBefore", "Asynchronous before", FieldKind::Checkbox, "asyncBefore")
                .with_is_edited(is_edited_when_checked)
                .with_description("Start the element in a new transaction."),
            Entry::property("skippable", "Skippable", FieldKind::Toggle, "skippable")
                .with_is_edited(is_edited_when_checked),
        ]
    } else if type_name == "bpmn:SequenceFlow" {
        vec![Entry::property("condition", "Condition", FieldKind::Expression, "condition")
            .with_is_edited(is_edited_when_set)
            .with_description("Expression evaluated when the flow is taken.")]
    } else {
        return None;
    };
    Some(Group::entries(DETAILS_GROUP, "Details", entries))
}

/// Provider of the input mappings list of tasks.
pub fn input_mappings_provider() -> Rc<dyn PropertiesProvider> {
    Rc::new(|element: &Element| -> GroupReducer {
        if !element.type_name().ends_with("Task") {
            return Box::new(|groups: Vec<Group>| groups);
        }
        let parent = Rc::clone(&element.business_object);
        let items: Vec<ListItem> = parent
            .borrow()
            .collection(INPUTS_COLLECTION)
            .into_iter()
            .map(mapping_item)
            .collect();

        let add_parent = Rc::clone(&parent);
        let list = ListGroup::new(INPUT_MAPPINGS_GROUP, "Input mappings", items)
            .with_add(move |modeling, element| {
                let id = format!("Mapping_{}", &Uuid::new_v4().simple().to_string()[..7]);
                let mapping = BusinessObject::new(id, "io:InputMapping").into_ref();
                modeling.add_to_collection(element, &add_parent, INPUTS_COLLECTION, mapping)
            })
            .with_remove(move |modeling, element, item| {
                modeling.remove_from_collection(element, &parent, INPUTS_COLLECTION, &item.id)
            });

        Box::new(move |mut groups: Vec<Group>| {
            groups.push(Group::List(list));
            groups
        })
    })
}

fn mapping_item(mapping: BusinessObjectRef) -> ListItem {
    let (id, target) = {
        let mapping = mapping.borrow();
        (mapping.id.clone(), mapping.get("target"))
    };
    let label = target.as_str().unwrap_or_default().to_string();
    let entries = vec![
        Entry::nested_property(
            format!("{id}-target"),
            "Process variable name",
            FieldKind::Text,
            Rc::clone(&mapping),
            "target",
        )
        .with_validate(validate_variable_name),
        Entry::nested_property(
            format!("{id}-source"),
            "Variable assignment value",
            FieldKind::Expression,
            Rc::clone(&mapping),
            "source",
        ),
    ];
    let source: Rc<dyn Any> = mapping;
    ListItem::new(id.clone(), label, entries)
        .with_auto_focus_entry(format!("{id}-target"))
        .with_source(source)
}

/// Validation of process variable names.
pub fn validate_variable_name(value: &FieldValue) -> Option<String> {
    let name = value.as_text();
    if name.is_empty() {
        Some("Must not be empty.".to_string())
    } else if name.chars().any(char::is_whitespace) {
        Some("Must not contain spaces.".to_string())
    } else if name.starts_with(|c: char| c.is_ascii_digit()) {
        Some("Must not start with a number.".to_string())
    } else {
        None
    }
}
