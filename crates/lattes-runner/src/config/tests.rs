#[cfg(test)]
mod tests {
    use super::super::*;
    use lattes_ingestion::StrategyKind;
    use std::path::PathBuf;

    fn write(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lattes.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_default_database_is_local_sqlite() {
        let db = DatabaseConfig::default();
        assert_eq!(db.url, "sqlite://lattes.db");
        assert_eq!(db.max_connections, 10);
        assert!(db.create_if_missing);
    }

    #[test]
    fn test_load_full_file() {
        let (_dir, path) = write(
            r#"
            [database]
            url = "sqlite:///var/lib/lattes/lattes.db"
            max_connections = 4

            [ingestion]
            curricula_root = "/data/curricula"
            log_dir = "/var/log/lattes"
            batch_size = 100
            strategy = "serial"
            "#,
        );
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.database.max_connections, 4);
        assert!(config.database.create_if_missing);
        assert_eq!(config.ingestion.batch_size, 100);
        assert_eq!(config.ingestion.strategy, StrategyKind::Serial);
        assert_eq!(config.ingestion.workers, 8);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from(dir.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let (_dir, path) = write("[ingestion]\nworkers = 0\n");
        assert!(Config::load_from(&path).is_err());
    }
}
