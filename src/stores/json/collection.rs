//! A generic JSON container file holding one collection of records in
//! creation order.

use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    marker::PhantomData,
    path::PathBuf,
    sync::Mutex,
};

use serde::{de::DeserializeOwned, Serialize};

use crate::Error;

/// One collection's container file plus the lock that serializes its
/// read-modify-write cycles.
///
/// Every mutation is a full read-modify-write of the container; the mutex is
/// held across the whole cycle, so concurrent mutations cannot lose updates.
#[derive(Debug)]
pub(crate) struct JsonCollection<T> {
    path: PathBuf,
    lock: Mutex<()>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCollection<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Create a handle for the container at `path`. The file itself is only
    /// created on first write.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
            _marker: PhantomData,
        }
    }

    /// Deserialize the whole container. A missing file is first-use
    /// bootstrap and yields an empty sequence, not an error.
    ///
    /// # Panics
    ///
    /// Panics if the collection lock is poisoned.
    pub fn read(&self) -> Result<Vec<T>, Error> {
        let _guard = self.lock.lock().unwrap();

        self.read_unlocked()
    }

    /// Run `op` over the deserialized records under the collection lock,
    /// then write the records back atomically.
    ///
    /// If `op` fails nothing is written, so multi-step checks (like a
    /// uniqueness probe before an insert) fail atomically.
    ///
    /// # Panics
    ///
    /// Panics if the collection lock is poisoned.
    pub fn mutate<R>(&self, op: impl FnOnce(&mut Vec<T>) -> Result<R, Error>) -> Result<R, Error> {
        let _guard = self.lock.lock().unwrap();

        let mut records = self.read_unlocked()?;
        let result = op(&mut records)?;
        self.write_unlocked(&records)?;

        Ok(result)
    }

    fn read_unlocked(&self) -> Result<Vec<T>, Error> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);

        serde_json::from_reader(reader).map_err(Error::from)
    }

    /// Serialize and overwrite the container: write to a temp file in the
    /// same directory, flush, sync, then rename over the original so a
    /// subsequent read never observes a partial write.
    fn write_unlocked(&self, records: &[T]) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);

        serde_json::to_writer_pretty(&mut writer, &records)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;

        fs::rename(&temp_path, &self.path).map_err(|error| {
            let _ = fs::remove_file(&temp_path);
            Error::from(error)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::JsonCollection;

    fn collection(dir: &std::path::Path) -> JsonCollection<u64> {
        JsonCollection::new(dir.join("numbers.json"))
    }

    #[test]
    fn read_of_missing_container_is_empty() {
        let dir = tempfile::tempdir().unwrap();

        let got = collection(dir.path()).read().unwrap();

        assert!(got.is_empty());
    }

    #[test]
    fn mutate_round_trips_records_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let numbers = collection(dir.path());

        numbers
            .mutate(|records| {
                records.extend([3, 1, 2]);
                Ok(())
            })
            .unwrap();

        assert_eq!(numbers.read().unwrap(), vec![3, 1, 2]);
    }

    #[test]
    fn failed_mutation_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let numbers = collection(dir.path());
        numbers
            .mutate(|records| {
                records.push(1);
                Ok(())
            })
            .unwrap();

        let result: Result<(), _> = numbers.mutate(|records| {
            records.push(2);
            Err(crate::Error::Conflict("email"))
        });

        assert!(result.is_err());
        assert_eq!(numbers.read().unwrap(), vec![1]);
    }

    #[test]
    fn creates_missing_directories_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let numbers: JsonCollection<u64> =
            JsonCollection::new(dir.path().join("nested").join("deeper").join("numbers.json"));

        numbers
            .mutate(|records| {
                records.push(7);
                Ok(())
            })
            .unwrap();

        assert_eq!(numbers.read().unwrap(), vec![7]);
    }

    #[test]
    fn concurrent_appends_lose_no_updates() {
        let dir = tempfile::tempdir().unwrap();
        let numbers = Arc::new(collection(dir.path()));

        let handles: Vec<_> = (0..8)
            .map(|thread| {
                let numbers = Arc::clone(&numbers);
                std::thread::spawn(move || {
                    for i in 0..5 {
                        numbers
                            .mutate(|records| {
                                records.push(thread * 5 + i);
                                Ok(())
                            })
                            .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(numbers.read().unwrap().len(), 40);
    }
}
