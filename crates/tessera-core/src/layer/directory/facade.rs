//! Directory - each directory operation as one retried transaction.

use futures::FutureExt;
use tessera_kv::Database;
use tokio_util::sync::CancellationToken;

use super::DirectoryError;
use super::layer::DirectoryLayer;
use super::subspace::DirectorySubspace;
use crate::retry::TransactionMode;
use crate::retry::TransactionRunner;

/// A [`DirectoryLayer`] bound to a [`TransactionRunner`].
///
/// Every method runs the matching layer operation in a transaction of its
/// own, retrying conflicts with the runner's policy. Use [`DirectoryLayer`]
/// directly to combine directory changes with other writes atomically.
pub struct Directory<D: Database> {
    layer: DirectoryLayer,
    runner: TransactionRunner<D>,
    cancel: CancellationToken,
}

impl<D: Database> Clone for Directory<D> {
    fn clone(&self) -> Self {
        Self {
            layer: self.layer.clone(),
            runner: self.runner.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

impl<D: Database> std::fmt::Debug for Directory<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Directory").field("layer", &self.layer).field("runner", &self.runner).finish()
    }
}

impl<D: Database> Directory<D> {
    /// Directory with the default layer layout.
    pub fn new(runner: TransactionRunner<D>) -> Self {
        Self::with_layer(runner, DirectoryLayer::new())
    }

    pub fn with_layer(runner: TransactionRunner<D>, layer: DirectoryLayer) -> Self {
        Self {
            layer,
            runner,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort in-flight and future operations when `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn layer(&self) -> &DirectoryLayer {
        &self.layer
    }

    pub fn runner(&self) -> &TransactionRunner<D> {
        &self.runner
    }

    /// See [`DirectoryLayer::create_or_open`].
    pub async fn create_or_open<S: AsRef<str>>(
        &self,
        path: &[S],
        layer: Option<&str>,
    ) -> Result<DirectorySubspace, DirectoryError> {
        let dir = self.layer.clone();
        let path = owned(path);
        let tag = layer.map(str::to_string);
        self.runner
            .run(TransactionMode::ReadWrite, &self.cancel, move |tr| {
                let (dir, path, tag) = (dir.clone(), path.clone(), tag.clone());
                async move { dir.create_or_open(tr, &path, tag.as_deref()).await }.boxed()
            })
            .await
    }

    /// See [`DirectoryLayer::create`].
    pub async fn create<S: AsRef<str>>(
        &self,
        path: &[S],
        layer: Option<&str>,
    ) -> Result<DirectorySubspace, DirectoryError> {
        let dir = self.layer.clone();
        let path = owned(path);
        let tag = layer.map(str::to_string);
        self.runner
            .run(TransactionMode::ReadWrite, &self.cancel, move |tr| {
                let (dir, path, tag) = (dir.clone(), path.clone(), tag.clone());
                async move { dir.create(tr, &path, tag.as_deref()).await }.boxed()
            })
            .await
    }

    /// See [`DirectoryLayer::open`].
    pub async fn open<S: AsRef<str>>(&self, path: &[S], layer: Option<&str>) -> Result<DirectorySubspace, DirectoryError> {
        let dir = self.layer.clone();
        let path = owned(path);
        let tag = layer.map(str::to_string);
        self.runner
            .run(TransactionMode::ReadOnly, &self.cancel, move |tr| {
                let (dir, path, tag) = (dir.clone(), path.clone(), tag.clone());
                async move { dir.open(tr, &path, tag.as_deref()).await }.boxed()
            })
            .await
    }

    /// See [`DirectoryLayer::exists`].
    pub async fn exists<S: AsRef<str>>(&self, path: &[S]) -> Result<bool, DirectoryError> {
        let dir = self.layer.clone();
        let path = owned(path);
        self.runner
            .run(TransactionMode::ReadOnly, &self.cancel, move |tr| {
                let (dir, path) = (dir.clone(), path.clone());
                async move { dir.exists(tr, &path).await }.boxed()
            })
            .await
    }

    /// See [`DirectoryLayer::list`].
    pub async fn list<S: AsRef<str>>(&self, path: &[S]) -> Result<Vec<String>, DirectoryError> {
        let dir = self.layer.clone();
        let path = owned(path);
        self.runner
            .run(TransactionMode::ReadOnly, &self.cancel, move |tr| {
                let (dir, path) = (dir.clone(), path.clone());
                async move { dir.list(tr, &path).await }.boxed()
            })
            .await
    }

    /// See [`DirectoryLayer::move_to`].
    pub async fn move_to<A: AsRef<str>, B: AsRef<str>>(
        &self,
        old_path: &[A],
        new_path: &[B],
    ) -> Result<DirectorySubspace, DirectoryError> {
        let dir = self.layer.clone();
        let old_path = owned(old_path);
        let new_path = owned(new_path);
        self.runner
            .run(TransactionMode::ReadWrite, &self.cancel, move |tr| {
                let (dir, old_path, new_path) = (dir.clone(), old_path.clone(), new_path.clone());
                async move { dir.move_to(tr, &old_path, &new_path).await }.boxed()
            })
            .await
    }

    /// See [`DirectoryLayer::remove`].
    pub async fn remove<S: AsRef<str>>(&self, path: &[S]) -> Result<(), DirectoryError> {
        let dir = self.layer.clone();
        let path = owned(path);
        self.runner
            .run(TransactionMode::ReadWrite, &self.cancel, move |tr| {
                let (dir, path) = (dir.clone(), path.clone());
                async move { dir.remove(tr, &path).await }.boxed()
            })
            .await
    }

    /// See [`DirectoryLayer::remove_if_exists`].
    pub async fn remove_if_exists<S: AsRef<str>>(&self, path: &[S]) -> Result<bool, DirectoryError> {
        let dir = self.layer.clone();
        let path = owned(path);
        self.runner
            .run(TransactionMode::ReadWrite, &self.cancel, move |tr| {
                let (dir, path) = (dir.clone(), path.clone());
                async move { dir.remove_if_exists(tr, &path).await }.boxed()
            })
            .await
    }
}

fn owned<S: AsRef<str>>(path: &[S]) -> Vec<String> {
    path.iter().map(|segment| segment.as_ref().to_string()).collect()
}
