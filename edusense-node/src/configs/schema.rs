use crate::models::{EnvRecordTable, PublishQueueTable, RadarRecordTable, Table};

/// Orders tables so that every table is created after the tables it references.
pub struct SchemaManager {
    tables: Vec<Box<dyn Table + Send + Sync>>,
}

impl SchemaManager {
    pub fn new(tables: Vec<Box<dyn Table + Send + Sync>>) -> Self {
        Self {
            tables: Self::resolve_order(tables),
        }
    }

    fn resolve_order(
        mut pending: Vec<Box<dyn Table + Send + Sync>>,
    ) -> Vec<Box<dyn Table + Send + Sync>> {
        let mut ordered: Vec<Box<dyn Table + Send + Sync>> = Vec::with_capacity(pending.len());

        while !pending.is_empty() {
            let ready = pending.iter().position(|table| {
                table.dependencies().iter().all(|dependency| {
                    ordered.iter().any(|resolved| resolved.name() == *dependency)
                })
            });

            match ready {
                Some(index) => ordered.push(pending.remove(index)),
                None => panic!("Circular dependency detected or unresolved dependencies exist."),
            }
        }

        ordered
    }

    pub fn table_names(&self) -> Vec<&'static str> {
        self.tables.iter().map(|table| table.name()).collect()
    }

    pub fn create_schema(&self) -> Vec<String> {
        self.tables.iter().map(|table| table.create()).collect()
    }

    pub fn dispose_schema(&self) -> Vec<String> {
        self.tables.iter().rev().map(|table| table.dispose()).collect()
    }
}

impl Default for SchemaManager {
    fn default() -> Self {
        SchemaManager::new(vec![
            Box::new(EnvRecordTable),
            Box::new(RadarRecordTable),
            Box::new(PublishQueueTable),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NamedTable {
        name: &'static str,
        dependencies: Vec<&'static str>,
    }

    impl Table for NamedTable {
        fn name(&self) -> &'static str {
            self.name
        }

        fn create(&self) -> String {
            format!("CREATE TABLE {};", self.name)
        }

        fn dispose(&self) -> String {
            format!("DROP TABLE {};", self.name)
        }

        fn dependencies(&self) -> Vec<&'static str> {
            self.dependencies.clone()
        }
    }

    fn table(name: &'static str, dependencies: &[&'static str]) -> Box<dyn Table + Send + Sync> {
        Box::new(NamedTable {
            name,
            dependencies: dependencies.to_vec(),
        })
    }

    #[test]
    fn test_dependencies_created_first() {
        let manager = SchemaManager::new(vec![
            table("radar_sectors", &["radar_samples"]),
            table("radar_samples", &["devices"]),
            table("devices", &[]),
        ]);

        assert_eq!(
            manager.create_schema(),
            vec![
                "CREATE TABLE devices;",
                "CREATE TABLE radar_samples;",
                "CREATE TABLE radar_sectors;",
            ]
        );
        assert_eq!(manager.dispose_schema()[0], "DROP TABLE radar_sectors;");
    }

    #[test]
    #[should_panic(expected = "Circular dependency")]
    fn test_circular_dependency_panics() {
        SchemaManager::new(vec![table("a", &["b"]), table("b", &["a"])]);
    }

    #[test]
    fn test_default_tables() {
        let names = SchemaManager::default().table_names();

        assert!(names.contains(&"env_samples"));
        assert!(names.contains(&"radar_samples"));
        assert!(names.contains(&"publish_queue"));
    }
}
