//! Dataset loader: descriptor list → reference images.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use reqwest::Url;
use tracing::{info, warn};

use super::descriptor::{MarkerDescriptor, parse_descriptors};
use super::error::DatasetError;
use super::fetch::Fetch;
use super::reference_image::ReferenceImage;

/// Fetches the remote dataset and builds the reference image set.
///
/// No retry policy: a failed load is reported once and the caller decides
/// whether to invoke it again.
#[derive(Clone)]
pub struct DatasetLoader {
    dataset_url: Url,
    fetcher: Arc<dyn Fetch>,
}

impl DatasetLoader {
    pub fn new(dataset_url: &str, fetcher: Arc<dyn Fetch>) -> Result<Self, DatasetError> {
        let dataset_url =
            Url::parse(dataset_url).map_err(|_| DatasetError::InvalidUrl(dataset_url.to_string()))?;
        Ok(Self {
            dataset_url,
            fetcher,
        })
    }

    pub fn dataset_url(&self) -> &Url {
        &self.dataset_url
    }

    /// Download and parse the descriptor list.
    pub fn load_descriptors(&self) -> Result<Vec<MarkerDescriptor>, DatasetError> {
        let body = self.fetcher.fetch(&self.dataset_url)?;
        parse_descriptors(&body)
    }

    /// Load the full reference image set, blocking the calling thread.
    ///
    /// All card photos are fetched concurrently and joined before returning.
    /// Cards whose photo fails are dropped; the result keeps descriptor order.
    pub fn load(&self) -> Result<Vec<ReferenceImage>, DatasetError> {
        let descriptors = self.load_descriptors()?;
        let images = self.fetch_reference_images(&descriptors);

        info!(
            "Loaded {} of {} reference images from {}",
            images.len(),
            descriptors.len(),
            self.dataset_url
        );
        Ok(images)
    }

    /// Run [`load`](Self::load) on a background thread and hand the result to
    /// `completion` exactly once.
    pub fn load_async<F>(&self, completion: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<Vec<ReferenceImage>, DatasetError>) + Send + 'static,
    {
        let loader = self.clone();
        thread::spawn(move || completion(loader.load()))
    }

    /// Fetch and decode every descriptor's photo concurrently.
    pub fn fetch_reference_images(&self, descriptors: &[MarkerDescriptor]) -> Vec<ReferenceImage> {
        thread::scope(|scope| {
            let handles: Vec<_> = descriptors
                .iter()
                .map(|d| scope.spawn(move || self.fetch_reference_image(d)))
                .collect();

            handles
                .into_iter()
                .zip(descriptors)
                .filter_map(|(handle, d)| match handle.join() {
                    Ok(Ok(image)) => Some(image),
                    Ok(Err(e)) => {
                        warn!("Dropping marker {}: {}", d.name, e);
                        None
                    }
                    Err(_) => {
                        warn!("Dropping marker {}: fetch thread panicked", d.name);
                        None
                    }
                })
                .collect()
        })
    }

    fn fetch_reference_image(
        &self,
        descriptor: &MarkerDescriptor,
    ) -> Result<ReferenceImage, DatasetError> {
        let bytes = self.fetcher.fetch(&descriptor.image_url)?;
        ReferenceImage::decode(&descriptor.name, &bytes, descriptor.width)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crossbeam_channel::bounded;

    use crate::dataset::reference_image::tests::png_bytes;

    /// In-memory fetcher; unknown URLs answer 404.
    pub(crate) struct MapFetcher {
        pub bodies: HashMap<String, Vec<u8>>,
        pub delay: Duration,
        in_flight: AtomicUsize,
        pub max_in_flight: AtomicUsize,
    }

    impl MapFetcher {
        pub(crate) fn new(bodies: HashMap<String, Vec<u8>>) -> Self {
            Self {
                bodies,
                delay: Duration::ZERO,
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }
    }

    impl Fetch for MapFetcher {
        fn fetch(&self, url: &Url) -> Result<Vec<u8>, DatasetError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            self.bodies
                .get(url.as_str())
                .cloned()
                .ok_or_else(|| DatasetError::Http {
                    url: url.to_string(),
                    status: 404,
                })
        }
    }

    pub(crate) const DATASET_URL: &str = "https://cards.example/dataset.json";

    /// Dataset with two good cards, one missing photo and one corrupt photo.
    pub(crate) fn sample_bodies() -> HashMap<String, Vec<u8>> {
        let dataset = br#"[
            {"imageURL":"https://cards.example/card1.png","name":"card1","width":0.1},
            {"imageURL":"https://cards.example/missing.png","name":"ghost","width":0.1},
            {"imageURL":"https://cards.example/corrupt.png","name":"corrupt","width":0.1},
            {"imageURL":"https://cards.example/card2.png","name":"card2","width":0.08},
            {"imageURL":"bad"}
        ]"#;

        let mut bodies = HashMap::new();
        bodies.insert(DATASET_URL.to_string(), dataset.to_vec());
        bodies.insert("https://cards.example/card1.png".to_string(), png_bytes(40, 20));
        bodies.insert("https://cards.example/card2.png".to_string(), png_bytes(30, 30));
        bodies.insert("https://cards.example/corrupt.png".to_string(), b"\x89PNG junk".to_vec());
        bodies
    }

    #[test]
    fn test_load_drops_failed_cards_and_keeps_order() {
        let loader = DatasetLoader::new(DATASET_URL, Arc::new(MapFetcher::new(sample_bodies()))).unwrap();
        let images = loader.load().unwrap();

        let names: Vec<_> = images.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["card1", "card2"]);
        assert_eq!(images[1].physical_width(), 0.08);
    }

    #[test]
    fn test_dataset_fetch_failure_is_error() {
        let loader = DatasetLoader::new(DATASET_URL, Arc::new(MapFetcher::new(HashMap::new()))).unwrap();
        let err = loader.load().unwrap_err();
        assert!(matches!(err, DatasetError::Http { status: 404, .. }));
    }

    #[test]
    fn test_malformed_dataset_is_error() {
        let mut bodies = HashMap::new();
        bodies.insert(DATASET_URL.to_string(), br#"{"cards": []}"#.to_vec());
        let loader = DatasetLoader::new(DATASET_URL, Arc::new(MapFetcher::new(bodies))).unwrap();

        assert!(matches!(loader.load(), Err(DatasetError::Malformed(_))));
    }

    #[test]
    fn test_invalid_dataset_url_rejected() {
        let result = DatasetLoader::new("not a url", Arc::new(MapFetcher::new(HashMap::new())));
        assert!(matches!(result, Err(DatasetError::InvalidUrl(_))));
    }

    #[test]
    fn test_images_fetched_concurrently() {
        let mut fetcher = MapFetcher::new(sample_bodies());
        fetcher.delay = Duration::from_millis(50);
        let fetcher = Arc::new(fetcher);
        let loader = DatasetLoader::new(DATASET_URL, fetcher.clone()).unwrap();

        let descriptors = loader.load_descriptors().unwrap();
        let images = loader.fetch_reference_images(&descriptors);

        assert_eq!(images.len(), 2);
        assert!(fetcher.max_in_flight.load(Ordering::SeqCst) >= 2);
    }

    #[test]
    fn test_load_async_delivers_once() {
        let loader = DatasetLoader::new(DATASET_URL, Arc::new(MapFetcher::new(sample_bodies()))).unwrap();
        let (tx, rx) = bounded(2);

        loader
            .load_async(move |result| {
                tx.send(result.map(|images| images.len())).unwrap();
            })
            .join()
            .unwrap();

        assert_eq!(rx.try_recv().unwrap().unwrap(), 2);
        assert!(rx.try_recv().is_err());
    }
}
