use crate::runtime::RuntimeHandle;

impl RuntimeHandle for tokio::runtime::Handle {
    fn spawn<F>(&self, f: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        // Dropping the join handle detaches the task
        drop(tokio::runtime::Handle::spawn(self, f));
    }
}
