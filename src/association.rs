// Copyright (c) 2022 Huawei Technologies Co.,Ltd. All rights reserved.
//
// sysMaster is licensed under Mulan PSL v2.
// You can use this software according to the terms and conditions of the Mulan
// PSL v2.
// You may obtain a copy of Mulan PSL v2 at:
//         http://license.coscl.org.cn/MulanPSL2
// THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY
// KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO
// NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
// See the Mulan PSL v2 for more details.

//! Descriptor to caller value mapping
use std::collections::HashMap;
use std::os::unix::io::RawFd;

/// The value handed back with a descriptor's readiness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Association<T> {
    /// no value was supplied, the descriptor stands for itself
    Descriptor(RawFd),
    /// a caller-supplied value
    Value(T),
}

impl<T> Association<T> {
    /// The caller value, if one was supplied.
    pub fn value(&self) -> Option<&T> {
        match self {
            Association::Descriptor(_) => None,
            Association::Value(v) => Some(v),
        }
    }

    /// The descriptor, if it is associated with itself.
    pub fn fd(&self) -> Option<RawFd> {
        match self {
            Association::Descriptor(fd) => Some(*fd),
            Association::Value(_) => None,
        }
    }
}

/// Associations of the registered descriptors.
#[derive(Debug)]
pub struct Associations<T> {
    table: HashMap<RawFd, Association<T>>,
}

impl<T> Default for Associations<T> {
    fn default() -> Self {
        Associations {
            table: HashMap::new(),
        }
    }
}

impl<T> Associations<T> {
    /// create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// associate `fd` with `value`, or with itself when `value` is `None`
    pub fn set(&mut self, fd: RawFd, value: Option<T>) {
        let association = match value {
            Some(v) => Association::Value(v),
            None => Association::Descriptor(fd),
        };
        self.table.insert(fd, association);
    }

    /// look up the association of `fd`
    pub fn get(&self, fd: RawFd) -> Option<&Association<T>> {
        self.table.get(&fd)
    }

    /// drop the association of `fd`; absent keys are ignored
    pub fn delete(&mut self, fd: RawFd) -> Option<Association<T>> {
        self.table.remove(&fd)
    }

    /// whether `fd` has an association
    pub fn contains(&self, fd: RawFd) -> bool {
        self.table.contains_key(&fd)
    }

    /// number of associations
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_descriptor() {
        let mut table: Associations<String> = Associations::new();
        table.set(7, None);
        assert_eq!(table.get(7), Some(&Association::Descriptor(7)));
        assert_eq!(table.get(7).unwrap().fd(), Some(7));
        assert!(table.get(7).unwrap().value().is_none());
    }

    #[test]
    fn test_set_overrides() {
        let mut table = Associations::new();
        table.set(4, Some("old"));
        table.set(4, Some("new"));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(4).unwrap().value(), Some(&"new"));
    }

    #[test]
    fn test_delete_absent() {
        let mut table: Associations<u32> = Associations::new();
        assert!(table.delete(9).is_none());
        table.set(9, Some(1));
        assert_eq!(table.delete(9), Some(Association::Value(1)));
        assert!(table.is_empty());
        assert!(!table.contains(9));
        assert!(table.delete(9).is_none());
    }
}
