use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// 以最大并发数 `max_concurrent` 执行一组异步任务，所有任务结束后按输入顺序返回结果
pub async fn do_parallel_with_limit<F, T>(futures: Vec<F>, max_concurrent: usize) -> Vec<T>
where
    F: Future<Output = T>,
{
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));

    let limited = futures.into_iter().map(|fut| {
        let semaphore = Arc::clone(&semaphore);
        async move {
            // 信号量从不关闭，acquire 不会失败
            let _permit = semaphore.acquire().await.ok();
            fut.await
        }
    });

    join_all(limited).await
}
