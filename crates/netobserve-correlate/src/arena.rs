use crate::record::RequestRecord;

/// A generational handle into an [`Arena`]. Stable across insertions; a
/// handle into a freed-and-reused slot fails its generation check rather
/// than aliasing the new occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    index: u32,
    generation: u32,
}

pub(crate) struct Slot {
    pub(crate) record: Option<RequestRecord>,
    generation: u32,
    pub(crate) port_next: Option<Handle>,
    pub(crate) wheel_next: Option<Handle>,
}

/// Backing store for request records. Replaces the source's intrusive
/// `TrafficInfo.Next` pointer chains with handles into a flat vector, so
/// eviction is a free-list push rather than relying on the garbage
/// collector to reclaim unlinked nodes.
#[derive(Default)]
pub(crate) struct Arena {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl Arena {
    pub(crate) fn insert(&mut self, record: RequestRecord) -> Handle {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.record = Some(record);
            slot.port_next = None;
            slot.wheel_next = None;
            Handle {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                record: Some(record),
                generation: 0,
                port_next: None,
                wheel_next: None,
            });
            Handle {
                index,
                generation: 0,
            }
        }
    }

    pub(crate) fn remove(&mut self, handle: Handle) {
        if let Some(slot) = self.slots.get_mut(handle.index as usize)
            && slot.generation == handle.generation
            && slot.record.is_some()
        {
            slot.record = None;
            slot.generation = slot.generation.wrapping_add(1);
            slot.port_next = None;
            slot.wheel_next = None;
            self.free.push(handle.index);
        }
    }

    pub(crate) fn get(&self, handle: Handle) -> Option<&Slot> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation && slot.record.is_some())
    }

    pub(crate) fn get_mut(&mut self, handle: Handle) -> Option<&mut Slot> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation && slot.record.is_some())
    }

    pub(crate) fn timestamp_millis(&self, handle: Handle) -> Option<i64> {
        self.get(handle)
            .map(|slot| slot.record.as_ref().unwrap().request_timestamp_nanos / 1_000_000)
    }

    pub(crate) fn port_of(&self, handle: Handle) -> Option<u32> {
        self.get(handle)
            .map(|slot| slot.record.as_ref().unwrap().src_port)
    }
}
