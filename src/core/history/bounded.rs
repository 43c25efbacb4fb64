use serde::Serialize;

/// Most-recent-first list that never grows past its capacity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BoundedList<T> {
    items: Vec<T>,
    #[serde(skip)]
    capacity: usize,
}

impl<T> BoundedList<T> {
    /// Adopt an existing most-recent-first sequence, dropping the oldest overflow
    pub fn from_vec(mut items: Vec<T>, capacity: usize) -> Self {
        items.truncate(capacity);
        Self { items, capacity }
    }

    /// Insert at the head, then evict from the tail
    pub fn prepend(&mut self, item: T) {
        self.items.insert(0, item);
        self.items.truncate(self.capacity);
    }

    pub fn head(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepend_evicts_oldest_first() {
        let mut list = BoundedList::from_vec(Vec::new(), 3);
        for i in 0..5 {
            list.prepend(i);
        }
        assert_eq!(list.as_slice(), &[4, 3, 2]);
        assert_eq!(list.head(), Some(&4));
    }

    #[test]
    fn from_vec_keeps_the_newest() {
        let mut list = BoundedList::from_vec(vec![9, 8, 7, 6], 2);
        assert_eq!(list.as_slice(), &[9, 8]);

        list.prepend(10);
        assert_eq!(list.as_slice(), &[10, 9]);
    }

    #[test]
    fn serializes_as_a_plain_array() {
        let list = BoundedList::from_vec(vec!["b", "a"], 10);
        assert_eq!(serde_json::to_string(&list).unwrap(), r#"["b","a"]"#);
    }
}
