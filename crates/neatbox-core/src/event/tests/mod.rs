
#[cfg(test)]
mod tests {
    use crate::event::EventPriority;

    #[test]
    fn test_event_priority_default() {
        assert_eq!(EventPriority::default(), EventPriority::Normal);
    }

    #[test]
    fn test_event_priority_values() {
        assert_eq!(i32::from(EventPriority::Low), -10);
        assert_eq!(i32::from(EventPriority::Normal), 0);
        assert_eq!(i32::from(EventPriority::High), 10);
        assert_eq!(i32::from(EventPriority::Critical), 100);
        assert!(EventPriority::Critical > EventPriority::High);
    }
}
