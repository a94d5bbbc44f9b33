//! Registration and resolution of properties providers.
//!
//! A provider contributes groups for an element by returning a reducer over the groups
//! collected so far, so it can append, reorder or amend what earlier providers produced.

use crate::constants::DEFAULT_PROVIDER_PRIORITY;
use crate::entries::Group;
use crate::model::Element;
use std::rc::Rc;

/// Curried step of group resolution: existing groups in, new groups out.
pub type GroupReducer = Box<dyn FnOnce(Vec<Group>) -> Vec<Group>>;

/// Supplies groups for the selected element.
pub trait PropertiesProvider {
    /// Returns the reducer applied to the groups of the providers that ran before.
    fn get_groups(&self, element: &Element) -> GroupReducer;
}

impl<F> PropertiesProvider for F
where
    F: Fn(&Element) -> GroupReducer,
{
    fn get_groups(&self, element: &Element) -> GroupReducer {
        self(element)
    }
}

struct Registration {
    priority: u32,
    provider: Rc<dyn PropertiesProvider>,
}

/// Providers ordered by priority; higher priorities run first.
#[derive(Default)]
pub struct ProviderRegistry {
    registrations: Vec<Registration>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider. `None` uses the default priority; lower priorities run later,
    /// equal priorities in registration order.
    pub fn register(&mut self, provider: Rc<dyn PropertiesProvider>, priority: Option<u32>) {
        let priority = priority.unwrap_or(DEFAULT_PROVIDER_PRIORITY);
        let index = self
            .registrations
            .iter()
            .position(|r| r.priority < priority)
            .unwrap_or(self.registrations.len());
        self.registrations
            .insert(index, Registration { priority, provider });
    }

    /// Folds every provider's reducer over an initially empty group list.
    pub fn resolve(&self, element: &Element) -> Vec<Group> {
        self.registrations
            .iter()
            .fold(Vec::new(), |groups, registration| {
                (registration.provider.get_groups(element))(groups)
            })
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Returns true if no provider is registered.
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BusinessObject;

    fn appending(id: &'static str) -> Rc<dyn PropertiesProvider> {
        Rc::new(move |_: &Element| -> GroupReducer {
            Box::new(move |mut groups: Vec<Group>| {
                groups.push(Group::entries(id, id, vec![]));
                groups
            })
        })
    }

    fn element() -> Element {
        Element::shape(BusinessObject::new("Task_1", "bpmn:Task"))
    }

    fn ids(groups: &[Group]) -> Vec<&str> {
        groups.iter().map(Group::id).collect()
    }

    #[test]
    fn lower_priority_runs_later() {
        let mut registry = ProviderRegistry::new();
        registry.register(appending("late"), Some(500));
        registry.register(appending("default"), None);
        registry.register(appending("early"), Some(2000));
        registry.register(appending("default-2"), None);

        let groups = registry.resolve(&element());
        assert_eq!(ids(&groups), vec!["early", "default", "default-2", "late"]);
    }

    #[test]
    fn reducers_can_rewrite_earlier_groups() {
        let mut registry = ProviderRegistry::new();
        registry.register(appending("general"), None);
        registry.register(appending("extra"), None);
        registry.register(
            Rc::new(|_: &Element| -> GroupReducer {
                Box::new(|groups: Vec<Group>| {
                    groups.into_iter().filter(|g| g.id() != "extra").collect()
                })
            }),
            Some(1),
        );

        assert_eq!(ids(&registry.resolve(&element())), vec!["general"]);
        assert_eq!(registry.len(), 3);
    }
}
