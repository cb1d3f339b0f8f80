use thiserror::Error;

/// フレーム単位のエラー
///
/// いずれも致命的ではなく、該当フレームをスキップして処理を続行する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CounterError {
    /// 脚のセグメント長がゼロ（腰・膝・足首の座標が重なっている）
    #[error("invalid geometry: zero-length leg segment")]
    InvalidGeometry,

    /// 角度計算に使える脚がない
    #[error("missing joints: no leg with valid hip, knee and ankle")]
    MissingJoints,

    /// 検出結果バッファの長さが6の倍数でない
    #[error("malformed detection buffer: length {len} is not a multiple of 6")]
    MalformedDetections { len: usize },
}
