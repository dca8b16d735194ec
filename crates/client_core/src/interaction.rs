//! Input sensors that turn pointer or keyboard drags into [`MoveRequest`]s.
//!
//! Every sensor implements [`MoveSensor`] and emits the same event type, so
//! the coordinator never sees which modality produced a move.

use shared::domain::ItemId;

/// Pointer travel required before a press becomes a drag.
pub const POINTER_ACTIVATION_DISTANCE: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRequest {
    pub source_id: ItemId,
    pub target_id: ItemId,
}

impl MoveRequest {
    pub fn new(source_id: ItemId, target_id: ItemId) -> Self {
        Self {
            source_id,
            target_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKey {
    Space,
    Up,
    Down,
    Escape,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorInput {
    PointerDown { item_id: ItemId, x: f64, y: f64 },
    /// `over` is the item under the pointer, if any.
    PointerMove { x: f64, y: f64, over: Option<ItemId> },
    PointerUp,
    Key { focused: Option<ItemId>, key: DragKey },
}

pub trait MoveSensor: Send {
    /// Feeds one input event. `order` is the currently displayed id order.
    /// Returns a request once a drag completes over a different item.
    fn handle(&mut self, input: &SensorInput, order: &[ItemId]) -> Option<MoveRequest>;

    fn is_dragging(&self) -> bool;
}

#[derive(Debug, Clone, Copy)]
struct PointerPress {
    item_id: ItemId,
    origin: (f64, f64),
    active: bool,
    over: Option<ItemId>,
}

#[derive(Debug, Default)]
pub struct PointerSensor {
    press: Option<PointerPress>,
}

impl PointerSensor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MoveSensor for PointerSensor {
    fn handle(&mut self, input: &SensorInput, order: &[ItemId]) -> Option<MoveRequest> {
        match *input {
            SensorInput::PointerDown { item_id, x, y } => {
                self.press = order.contains(&item_id).then_some(PointerPress {
                    item_id,
                    origin: (x, y),
                    active: false,
                    over: None,
                });
                None
            }
            SensorInput::PointerMove { x, y, over } => {
                if let Some(press) = self.press.as_mut() {
                    let distance = (x - press.origin.0).hypot(y - press.origin.1);
                    if distance >= POINTER_ACTIVATION_DISTANCE {
                        press.active = true;
                    }
                    if press.active {
                        press.over = over.filter(|id| order.contains(id));
                    }
                }
                None
            }
            SensorInput::PointerUp => {
                let press = self.press.take()?;
                let target_id = press.over.filter(|_| press.active)?;
                (target_id != press.item_id).then(|| MoveRequest::new(press.item_id, target_id))
            }
            SensorInput::Key { .. } => None,
        }
    }

    fn is_dragging(&self) -> bool {
        self.press.is_some_and(|press| press.active)
    }
}

#[derive(Debug, Clone, Copy)]
struct KeyboardDrag {
    item_id: ItemId,
    target_index: usize,
}

/// Space picks up the focused item, arrows move the drop target, space drops,
/// escape cancels.
#[derive(Debug, Default)]
pub struct KeyboardSensor {
    drag: Option<KeyboardDrag>,
}

impl KeyboardSensor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MoveSensor for KeyboardSensor {
    fn handle(&mut self, input: &SensorInput, order: &[ItemId]) -> Option<MoveRequest> {
        let SensorInput::Key { focused, key } = *input else {
            return None;
        };

        let Some(mut drag) = self.drag.take() else {
            if key == DragKey::Space {
                let item_id = focused?;
                let target_index = order.iter().position(|id| *id == item_id)?;
                self.drag = Some(KeyboardDrag {
                    item_id,
                    target_index,
                });
            }
            return None;
        };

        match key {
            DragKey::Up => drag.target_index = drag.target_index.saturating_sub(1),
            DragKey::Down => {
                if drag.target_index + 1 < order.len() {
                    drag.target_index += 1;
                }
            }
            DragKey::Escape => return None,
            DragKey::Space => {
                let target_id = *order.get(drag.target_index)?;
                return (target_id != drag.item_id)
                    .then(|| MoveRequest::new(drag.item_id, target_id));
            }
        }
        self.drag = Some(drag);
        None
    }

    fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }
}

/// Fans each input out to every sensor and yields the first completed move.
pub struct SensorSet {
    sensors: Vec<Box<dyn MoveSensor>>,
}

impl SensorSet {
    pub fn new(sensors: Vec<Box<dyn MoveSensor>>) -> Self {
        Self { sensors }
    }

    pub fn handle(&mut self, input: &SensorInput, order: &[ItemId]) -> Option<MoveRequest> {
        let mut completed = None;
        for sensor in &mut self.sensors {
            if let Some(request) = sensor.handle(input, order) {
                completed.get_or_insert(request);
            }
        }
        completed
    }

    pub fn is_dragging(&self) -> bool {
        self.sensors.iter().any(|sensor| sensor.is_dragging())
    }
}

impl Default for SensorSet {
    fn default() -> Self {
        Self::new(vec![
            Box::new(PointerSensor::new()),
            Box::new(KeyboardSensor::new()),
        ])
    }
}

#[cfg(test)]
#[path = "tests/interaction_tests.rs"]
mod tests;
