use id_collections::{Count, Id};

/// Hands out fresh ids in order.
#[derive(Clone, Debug)]
pub struct IdGen<T: Id> {
    next: Count<T>,
}

impl<T: Id> IdGen<T> {
    pub fn new() -> IdGen<T> {
        IdGen { next: Count::new() }
    }

    pub fn fresh(&mut self) -> T {
        self.next.inc()
    }

    pub fn count(&self) -> Count<T> {
        self.next.clone()
    }
}

impl<T: Id> Default for IdGen<T> {
    fn default() -> Self {
        IdGen::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use id_collections::id_type;

    #[id_type]
    struct TestId(usize);

    #[test]
    fn test_fresh_ids_are_sequential() {
        let mut ids = IdGen::<TestId>::new();
        assert_eq!(ids.fresh(), TestId(0));
        assert_eq!(ids.fresh(), TestId(1));

        let mut count = ids.count();
        assert_eq!(count.inc(), TestId(2));
        assert_eq!(ids.fresh(), TestId(2));
    }
}
