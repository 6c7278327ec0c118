/// Allows for inserting into a `ReserveVec` at a specific position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservePos(usize);

impl ReservePos {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug)]
enum VecItem<T> {
    Value(T),
    Marker,
}

/// A vector wrapper enabling reserving positions in the vector.
///
/// Positions never move, a reserved slot keeps its index until it is filled.
#[derive(Debug)]
pub struct ReserveVec<T> {
    vec: Vec<VecItem<T>>,
}

impl<T> ReserveVec<T> {
    pub fn new() -> ReserveVec<T> {
        ReserveVec { vec: Vec::new() }
    }

    /// Push a value, returning its index.
    pub fn push(&mut self, value: T) -> usize {
        self.vec.push(VecItem::Value(value));
        self.vec.len() - 1
    }

    /// Reserve the next position in the vector.
    pub fn reserve_next(&mut self) -> ReservePos {
        let idx = self.vec.len();
        self.vec.push(VecItem::Marker);
        ReservePos(idx)
    }

    /// Insert a value at a previously reserved position.
    pub fn insert_at_reserved(&mut self, pos: ReservePos, value: T) {
        self.vec[pos.0] = VecItem::Value(value);
    }

    pub fn is_reserved(&self, idx: usize) -> bool {
        matches!(self.vec.get(idx), Some(VecItem::Marker))
    }

    /// Unwrap into the filled values. Errors with the first position that
    /// was reserved but never filled.
    pub fn into_values(self) -> Result<Vec<T>, ReservePos> {
        self.vec
            .into_iter()
            .enumerate()
            .map(|(idx, v)| match v {
                VecItem::Value(v) => Ok(v),
                VecItem::Marker => Err(ReservePos(idx)),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_reservations() {
        let mut r = ReserveVec::new();
        assert_eq!(r.push(1), 0);
        assert_eq!(r.push(2), 1);
        r.push(3);
        assert_eq!(r.into_values().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn reservation_at_beginning() {
        let mut r = ReserveVec::new();
        let pos = r.reserve_next();
        assert_eq!(r.push(1), 1);
        r.push(2);
        assert!(r.is_reserved(pos.index()));
        r.insert_at_reserved(pos, 3);
        assert!(!r.is_reserved(pos.index()));
        assert_eq!(r.into_values().unwrap(), vec![3, 1, 2]);
    }

    #[test]
    fn multiple_reservations() {
        let mut r = ReserveVec::new();
        let p1 = r.reserve_next();
        r.push(1);
        let p2 = r.reserve_next();
        let p3 = r.reserve_next();
        r.push(2);
        let p4 = r.reserve_next();
        r.insert_at_reserved(p1, 3);
        r.insert_at_reserved(p2, 4);
        r.insert_at_reserved(p3, 5);
        r.insert_at_reserved(p4, 6);
        assert_eq!(r.into_values().unwrap(), vec![3, 1, 4, 5, 2, 6]);
    }

    #[test]
    fn unfilled_reservation() {
        let mut r = ReserveVec::new();
        r.push(1);
        let pos = r.reserve_next();
        r.push(2);
        assert_eq!(r.into_values(), Err(pos));
    }
}
