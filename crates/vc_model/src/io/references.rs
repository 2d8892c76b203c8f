use alloc::vec::Vec;

use crate::ObjectRef;
use crate::utils::IdentityMap;

/// Object identities met by a writer, and their slot ids.
///
/// Holds a handle to every object so identities stay unique for the whole
/// session.
#[derive(Default)]
pub(crate) struct ReferenceTable {
    ids: IdentityMap<usize>,
    objects: Vec<Option<ObjectRef>>,
}

impl ReferenceTable {
    /// Reserves the next id for a value that is not a shared object.
    pub fn reserve(&mut self) -> usize {
        self.objects.push(None);
        self.objects.len() - 1
    }

    #[inline]
    pub fn get(&self, object: &ObjectRef) -> Option<usize> {
        self.ids.get(&object.identity()).copied()
    }

    /// Assigns the next id to `object`. The object must not be present.
    pub fn insert(&mut self, object: ObjectRef) -> usize {
        let id = self.objects.len();
        self.ids.insert(object.identity(), id);
        self.objects.push(Some(object));
        id
    }
}
